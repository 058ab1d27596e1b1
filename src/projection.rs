use crate::enums::{RenderMode, TransferPreset};
use crate::volume::VolumeField;

use glam::{EulerRot, Quat, Vec3};
use image::{ImageBuffer, Rgba};
use rayon::prelude::*;

/// Ray marching never takes fewer steps than this.
pub const MIN_PROJECTION_SAMPLES: usize = 64;

/// Front-to-back compositing stops accumulating past this alpha.
pub const COMPOSITE_ALPHA_CUTOFF: f32 = 0.95;

/// Diagonal of the unit cube; the full march distance.
const RAY_SPAN: f32 = 1.732_050_8;

/// Everything a projection render needs besides the volume itself.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionParams {
    pub mode: RenderMode,
    pub preset: TransferPreset,
    /// Rotation about the vertical axis, radians.
    pub azimuth: f32,
    /// Rotation about the horizontal axis, radians.
    pub elevation: f32,
    pub samples: usize,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            mode: RenderMode::MaxIntensity,
            preset: TransferPreset::default(),
            azimuth: 0.0,
            elevation: 0.0,
            samples: MIN_PROJECTION_SAMPLES,
        }
    }
}

/// Orthographic ray through the unit cube, shared by every mode.
struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Origin sits half the cube diagonal behind the center so the ray
    /// enters the cube from any rotation.
    fn for_pixel(azimuth: f32, elevation: f32, ndc: (f32, f32)) -> Self {
        let rotation = Quat::from_euler(EulerRot::YXZ, azimuth, elevation, 0.0);
        let direction = rotation * Vec3::Z;
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        let center = Vec3::splat(0.5);
        let origin =
            center + right * (ndc.0 * 0.5) + up * (ndc.1 * 0.5) - direction * (RAY_SPAN / 2.0);
        Self { origin, direction }
    }

    fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[inline]
fn inside_unit_cube(p: Vec3) -> bool {
    (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y) && (0.0..=1.0).contains(&p.z)
}

/// Ray-march one screen pixel. `ndc` is centered normalized device
/// coordinates in [-1, 1]². `RenderMode::Slice` has no projection and
/// yields transparent black; callers route it to the plane renderer.
pub fn project_pixel(
    volume: &VolumeField,
    params: &ProjectionParams,
    ndc: (f32, f32),
) -> [u8; 4] {
    let ray = Ray::for_pixel(params.azimuth, params.elevation, ndc);
    let steps = params.samples.max(MIN_PROJECTION_SAMPLES);

    match params.mode {
        RenderMode::Slice => [0, 0, 0, 0],
        RenderMode::MaxIntensity => gray_pixel(extremum_along(volume, &ray, steps, f32::max)),
        RenderMode::MinIntensity => gray_pixel(extremum_along(volume, &ray, steps, f32::min)),
        RenderMode::AverageIntensity => gray_pixel(average_along(volume, &ray, steps)),
        RenderMode::Composite => composite_along(volume, &ray, steps, params.preset),
    }
}

/// Render a full projection image in parallel rows.
pub fn render_projection(
    volume: &VolumeField,
    params: &ProjectionParams,
    out_width: u32,
    out_height: u32,
) -> Option<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    let pixels: Vec<u8> = (0..out_height)
        .into_par_iter()
        .flat_map(|py| {
            (0..out_width)
                .flat_map(|px| {
                    let ndc = (
                        (px as f32 + 0.5) / out_width as f32 * 2.0 - 1.0,
                        (py as f32 + 0.5) / out_height as f32 * 2.0 - 1.0,
                    );
                    project_pixel(volume, params, ndc)
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    ImageBuffer::from_raw(out_width, out_height, pixels)
}

/// Running max/min of raw samples along the ray, window-normalized at the
/// end. `None` when the ray misses the cube entirely.
fn extremum_along(
    volume: &VolumeField,
    ray: &Ray,
    steps: usize,
    pick: fn(f32, f32) -> f32,
) -> Option<f32> {
    let mut best: Option<f32> = None;
    for i in 0..steps {
        let t = RAY_SPAN * i as f32 / (steps - 1) as f32;
        let p = ray.point_at(t);
        if !inside_unit_cube(p) {
            continue;
        }
        let raw = volume.sample_trilinear(p.x, p.y, p.z);
        best = Some(match best {
            Some(current) => pick(current, raw),
            None => raw,
        });
    }
    best.map(|raw| volume.window().normalize(volume.rescale(raw)))
}

/// Mean normalized intensity over valid samples; 0 when the ray misses.
fn average_along(volume: &VolumeField, ray: &Ray, steps: usize) -> Option<f32> {
    let mut sum = 0.0f32;
    let mut valid = 0usize;
    for i in 0..steps {
        let t = RAY_SPAN * i as f32 / (steps - 1) as f32;
        let p = ray.point_at(t);
        if !inside_unit_cube(p) {
            continue;
        }
        let raw = volume.sample_trilinear(p.x, p.y, p.z);
        sum += volume.window().normalize(volume.rescale(raw));
        valid += 1;
    }
    if valid == 0 {
        return Some(0.0);
    }
    Some(sum / valid as f32)
}

/// Front-to-back alpha compositing with early ray termination. Residual
/// transparency composites against a black background.
fn composite_along(
    volume: &VolumeField,
    ray: &Ray,
    steps: usize,
    preset: TransferPreset,
) -> [u8; 4] {
    let mut acc_color = [0.0f32; 3];
    let mut acc_alpha = 0.0f32;

    for i in 0..steps {
        let t = RAY_SPAN * i as f32 / (steps - 1) as f32;
        let p = ray.point_at(t);
        if !inside_unit_cube(p) {
            continue;
        }
        let intensity = volume.rescale(volume.sample_trilinear(p.x, p.y, p.z));
        let [r, g, b, opacity] = preset.sample(intensity);
        let weight = (1.0 - acc_alpha) * opacity;
        acc_color[0] += weight * r;
        acc_color[1] += weight * g;
        acc_color[2] += weight * b;
        acc_alpha += weight;
        if acc_alpha >= COMPOSITE_ALPHA_CUTOFF {
            break;
        }
    }

    [
        VolumeField::to_u8(acc_color[0]),
        VolumeField::to_u8(acc_color[1]),
        VolumeField::to_u8(acc_color[2]),
        255,
    ]
}

fn gray_pixel(normalized: Option<f32>) -> [u8; 4] {
    let gray = VolumeField::to_u8(normalized.unwrap_or(0.0));
    [gray, gray, gray, 255]
}
