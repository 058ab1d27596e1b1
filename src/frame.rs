use ndarray::Array2;
use thiserror::Error;

/// Error reported by the external frame decoder.
#[derive(Debug, Clone, Error)]
#[error("decode failed: {0}")]
pub struct DecodeError(pub String);

/// One decoded 2D slice as delivered by the external decoding collaborator.
///
/// Immutable once produced. `pixels` is row-major with shape
/// `(height, width)`; all geometry fields are in physical units (mm).
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Array2<u16>,
    pub bits_stored: u16,
    pub rescale_slope: f32,
    pub rescale_intercept: f32,
    pub window_center: Option<f32>,
    pub window_width: Option<f32>,
    /// (column, row) spacing, if the source carried it.
    pub pixel_spacing: Option<(f32, f32)>,
    /// Z component of the slice position along the patient axis.
    pub position_z: Option<f32>,
    pub slice_thickness: Option<f32>,
}

impl DecodedFrame {
    /// Byte footprint of the pixel buffer (16-bit samples).
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }
}

/// Narrow contract to the external decoder: one frame per (series, index).
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, series: &str, index: usize) -> Result<DecodedFrame, DecodeError>;
}

/// Window center/width normalization range for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    pub center: f32,
    pub width: f32,
}

impl WindowLevel {
    pub fn new(center: f32, width: f32) -> Self {
        Self { center, width }
    }

    /// Map a physical intensity into [0, 1]. A non-positive width is
    /// treated as 1 so the mapping stays defined.
    #[inline]
    pub fn normalize(&self, intensity: f32) -> f32 {
        let width = if self.width > 0.0 { self.width } else { 1.0 };
        ((intensity - (self.center - width / 2.0)) / width).clamp(0.0, 1.0)
    }
}

/// Normalized cursor position within the three orthogonal views.
///
/// One mutable record per viewing session, shared by reference between the
/// plane renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePosition {
    axial: f32,
    coronal: f32,
    sagittal: f32,
}

impl Default for SlicePosition {
    fn default() -> Self {
        Self {
            axial: 0.5,
            coronal: 0.5,
            sagittal: 0.5,
        }
    }
}

impl SlicePosition {
    pub fn axial(&self) -> f32 {
        self.axial
    }

    pub fn coronal(&self) -> f32 {
        self.coronal
    }

    pub fn sagittal(&self) -> f32 {
        self.sagittal
    }

    pub fn set_axial(&mut self, p: f32) {
        self.axial = p.clamp(0.0, 1.0);
    }

    pub fn set_coronal(&mut self, p: f32) {
        self.coronal = p.clamp(0.0, 1.0);
    }

    pub fn set_sagittal(&mut self, p: f32) {
        self.sagittal = p.clamp(0.0, 1.0);
    }
}
