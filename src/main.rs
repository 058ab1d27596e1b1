use ndarray::Array2;
use voxelview::assembler::{SliceSource, VolumeAssembler};
use voxelview::enums::{Plane, RenderMode, TransferPreset};
use voxelview::frame::DecodedFrame;
use voxelview::projection::{ProjectionParams, render_projection};

/// Renders a synthetic sphere phantom to PNGs, one per plane plus a MIP
/// and a composited projection.
fn main() {
    env_logger::init();

    let sources: Vec<SliceSource> = (0..64)
        .map(|i| SliceSource {
            identifier: format!("phantom-{i:03}"),
            instance: i,
            frame: Ok(sphere_slice(i as f32 / 63.0)),
        })
        .collect();

    let volume = VolumeAssembler::assemble(sources, |done, total| {
        if done == total {
            log::info!("copied {total} slices");
        }
    })
    .expect("phantom series should assemble");

    let window = volume.window();
    for (plane, name) in [
        (Plane::Axial, "axial"),
        (Plane::Coronal, "coronal"),
        (Plane::Sagittal, "sagittal"),
    ] {
        let image = volume
            .render_plane(plane, 0.5, &window, 256, 256)
            .expect("plane render");
        image.save(format!("{name}.png")).expect("save plane");
    }

    for (mode, preset, name) in [
        (RenderMode::MaxIntensity, TransferPreset::Bone, "mip"),
        (RenderMode::Composite, TransferPreset::Bone, "composite"),
    ] {
        let params = ProjectionParams {
            mode,
            preset,
            azimuth: 0.6,
            elevation: -0.3,
            samples: 128,
        };
        let image = render_projection(&volume, &params, 256, 256).expect("projection render");
        image.save(format!("{name}.png")).expect("save projection");
    }
}

/// One slice of a dense sphere centered in the volume, in CT-like units.
fn sphere_slice(z: f32) -> DecodedFrame {
    let size = 64usize;
    let pixels = Array2::from_shape_fn((size, size), |(row, col)| {
        let x = col as f32 / (size - 1) as f32 - 0.5;
        let y = row as f32 / (size - 1) as f32 - 0.5;
        let d = (x * x + y * y + (z - 0.5) * (z - 0.5)).sqrt();
        if d < 0.3 {
            3000u16 // reads as dense bone after rescale
        } else {
            500u16
        }
    });
    DecodedFrame {
        width: size as u32,
        height: size as u32,
        pixels,
        bits_stored: 12,
        rescale_slope: 1.0,
        rescale_intercept: -1024.0,
        window_center: Some(300.0),
        window_width: Some(1500.0),
        pixel_spacing: Some((1.0, 1.0)),
        position_z: Some(z * 63.0),
        slice_thickness: Some(1.0),
    }
}
