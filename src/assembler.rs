use crate::frame::{DecodeError, DecodedFrame, WindowLevel};
use crate::volume::VolumeField;

use ndarray::{Array3, ArrayViewMut2};
use thiserror::Error;

/// Smallest depth for which orthogonal reconstruction and projection are
/// meaningful.
const MIN_SLICES: usize = 3;

/// Z deltas below this are treated as duplicate positions.
const MIN_Z_DELTA: f32 = 0.001;

#[derive(Debug, Error)]
pub enum VolumeLoadError {
    #[error("No instances supplied for volume assembly")]
    NoInstances,

    #[error("Fewer than {MIN_SLICES} slices supplied")]
    InsufficientSlices,

    #[error("Inconsistent slice dimensions")]
    InconsistentDimensions,

    #[error("Slice {identifier} failed to decode")]
    DecodeFailed {
        identifier: String,
        source: DecodeError,
    },
}

/// One slice handed to the assembler: the catalog's identifier and ordinal
/// plus the decoder's output for that instance.
pub struct SliceSource {
    pub identifier: String,
    pub instance: i32,
    pub frame: Result<DecodedFrame, DecodeError>,
}

pub struct VolumeAssembler;

impl VolumeAssembler {
    /// Assemble a whole series of decoded slices into a [`VolumeField`].
    ///
    /// Slices are sorted ascending by Z position when every frame carries
    /// one, otherwise ascending by instance ordinal. `on_progress` is called
    /// once per copied slice with (done, total).
    ///
    /// # Errors
    ///
    /// Fails without producing a partial volume on an empty input, fewer
    /// than three slices, any upstream decode failure, or a slice whose
    /// dimensions differ from the first slice's.
    pub fn assemble(
        sources: Vec<SliceSource>,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<VolumeField, VolumeLoadError> {
        if sources.is_empty() {
            return Err(VolumeLoadError::NoInstances);
        }
        if sources.len() < MIN_SLICES {
            return Err(VolumeLoadError::InsufficientSlices);
        }

        let mut frames = Vec::with_capacity(sources.len());
        for source in sources {
            match source.frame {
                Ok(frame) => frames.push((source.instance, frame)),
                Err(cause) => {
                    return Err(VolumeLoadError::DecodeFailed {
                        identifier: source.identifier,
                        source: cause,
                    });
                }
            }
        }

        Self::sort_frames(&mut frames);
        let frames: Vec<DecodedFrame> = frames.into_iter().map(|(_, frame)| frame).collect();

        Self::validate_dimensions(&frames)?;

        let z_spacing = Self::derive_z_spacing(&frames);
        let first = &frames[0];
        let (x_spacing, y_spacing) = first.pixel_spacing.unwrap_or((1.0, 1.0));
        let window = Self::derive_window(first);
        let slope = first.rescale_slope;
        let intercept = first.rescale_intercept;
        let bits_stored = first.bits_stored;

        let data = Self::build_volume_array(&frames, &mut on_progress);

        log::info!(
            "assembled volume {}x{}x{} (z spacing {:.3})",
            first.width,
            first.height,
            frames.len(),
            z_spacing
        );

        Ok(VolumeField::new(
            data,
            (x_spacing, y_spacing, z_spacing),
            slope,
            intercept,
            window,
            bits_stored,
        ))
    }

    /// Full stable sort: ascending Z when every frame has a position,
    /// ascending instance ordinal otherwise. Input order carries no
    /// guarantee.
    fn sort_frames(frames: &mut [(i32, DecodedFrame)]) {
        if frames.iter().all(|(_, frame)| frame.position_z.is_some()) {
            frames.sort_by(|a, b| {
                a.1.position_z
                    .partial_cmp(&b.1.position_z)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        } else {
            frames.sort_by_key(|(instance, _)| *instance);
        }
    }

    fn validate_dimensions(frames: &[DecodedFrame]) -> Result<(), VolumeLoadError> {
        let (width, height) = (frames[0].width, frames[0].height);
        if frames
            .iter()
            .any(|frame| frame.width != width || frame.height != height)
        {
            return Err(VolumeLoadError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Mean |Δz| between adjacent sorted slices, ignoring near-zero deltas
    /// from duplicated positions. Falls back to the first frame's slice
    /// thickness, then to 1.0.
    fn derive_z_spacing(frames: &[DecodedFrame]) -> f32 {
        let deltas: Vec<f32> = frames
            .windows(2)
            .filter_map(|pair| match (pair[0].position_z, pair[1].position_z) {
                (Some(a), Some(b)) => Some((b - a).abs()),
                _ => None,
            })
            .filter(|delta| *delta >= MIN_Z_DELTA)
            .collect();

        if !deltas.is_empty() {
            return deltas.iter().sum::<f32>() / deltas.len() as f32;
        }

        match frames[0].slice_thickness {
            Some(thickness) if thickness > 0.0 => thickness,
            _ => 1.0,
        }
    }

    /// Window from the first slice, or a computed default spanning the
    /// representable range of the stored bit depth.
    fn derive_window(first: &DecodedFrame) -> WindowLevel {
        if let (Some(center), Some(width)) = (first.window_center, first.window_width) {
            return WindowLevel::new(center, width);
        }
        let range = (1u32 << first.bits_stored.min(16)) as f32;
        let width = (first.rescale_slope.abs() * range).max(1.0);
        let center = first.rescale_slope * range / 2.0 + first.rescale_intercept;
        WindowLevel::new(center, width)
    }

    fn build_volume_array(
        frames: &[DecodedFrame],
        on_progress: &mut impl FnMut(usize, usize),
    ) -> Array3<u16> {
        let (width, height) = (frames[0].width as usize, frames[0].height as usize);
        let depth = frames.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, frame) in frames.iter().enumerate() {
            let mut slot: ArrayViewMut2<u16> = volume.index_axis_mut(ndarray::Axis(0), i);
            slot.assign(&frame.pixels);
            on_progress(i + 1, depth);
        }

        volume
    }
}
