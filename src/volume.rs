use crate::enums::Plane;
use crate::frame::WindowLevel;

use image::ImageBuffer;
use image::Luma;
use image::Rgba;
use ndarray::Array3;
use rayon::prelude::*;

/// Crosshair overlay color (RGB) blended into plane renderings.
const CROSSHAIR_COLOR: [u8; 3] = [255, 160, 0];
const CROSSHAIR_BLEND: f32 = 0.6;

/// The assembled scalar field for one series.
///
/// `data` has shape `(depth, height, width)` and is slice-major: slice 0
/// occupies the first `width * height` elements. Immutable after assembly.
#[derive(Debug)]
pub struct VolumeField {
    data: Array3<u16>,
    /// Physical voxel spacing (x, y, z).
    spacing: (f32, f32, f32),
    rescale_slope: f32,
    rescale_intercept: f32,
    window: WindowLevel,
    bits_stored: u16,
}

impl VolumeField {
    pub(crate) fn new(
        data: Array3<u16>,
        spacing: (f32, f32, f32),
        rescale_slope: f32,
        rescale_intercept: f32,
        window: WindowLevel,
        bits_stored: u16,
    ) -> Self {
        Self {
            data,
            spacing,
            rescale_slope,
            rescale_intercept,
            window,
            bits_stored,
        }
    }

    /// Dimensions as (depth, height, width).
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    pub fn spacing(&self) -> (f32, f32, f32) {
        self.spacing
    }

    /// The default window taken from the source series.
    pub fn window(&self) -> WindowLevel {
        self.window
    }

    pub fn bits_stored(&self) -> u16 {
        self.bits_stored
    }

    /// Raw stored sample to physical intensity.
    #[inline]
    pub fn rescale(&self, raw: f32) -> f32 {
        raw * self.rescale_slope + self.rescale_intercept
    }

    /// Nearest-voxel sample at a normalized [0, 1]³ coordinate,
    /// clamp-to-edge outside that range.
    pub fn sample_nearest(&self, x: f32, y: f32, z: f32) -> f32 {
        let (depth, height, width) = self.data.dim();
        let ix = Self::to_index(x, width);
        let iy = Self::to_index(y, height);
        let iz = Self::to_index(z, depth);
        self.data[[iz, iy, ix]] as f32
    }

    /// Trilinear sample at a normalized [0, 1]³ coordinate,
    /// clamp-to-edge outside that range.
    pub fn sample_trilinear(&self, x: f32, y: f32, z: f32) -> f32 {
        let (depth, height, width) = self.data.dim();
        let fx = x.clamp(0.0, 1.0) * (width - 1) as f32;
        let fy = y.clamp(0.0, 1.0) * (height - 1) as f32;
        let fz = z.clamp(0.0, 1.0) * (depth - 1) as f32;

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let z0 = fz.floor() as usize;
        let x1 = (x0 + 1).min(width - 1);
        let y1 = (y0 + 1).min(height - 1);
        let z1 = (z0 + 1).min(depth - 1);

        let dx = fx - x0 as f32;
        let dy = fy - y0 as f32;
        let dz = fz - z0 as f32;

        let lerp = |a: f32, b: f32, t: f32| a.mul_add(1.0 - t, b * t);

        let c00 = lerp(
            self.data[[z0, y0, x0]] as f32,
            self.data[[z0, y0, x1]] as f32,
            dx,
        );
        let c01 = lerp(
            self.data[[z0, y1, x0]] as f32,
            self.data[[z0, y1, x1]] as f32,
            dx,
        );
        let c10 = lerp(
            self.data[[z1, y0, x0]] as f32,
            self.data[[z1, y0, x1]] as f32,
            dx,
        );
        let c11 = lerp(
            self.data[[z1, y1, x0]] as f32,
            self.data[[z1, y1, x1]] as f32,
            dx,
        );

        lerp(lerp(c00, c01, dy), lerp(c10, c11, dy), dz)
    }

    /// 3D coordinate sampled for screen coordinate (u, v) of a plane held
    /// at normalized position `p`.
    #[inline]
    pub fn plane_coordinate(plane: Plane, p: f32, u: f32, v: f32) -> (f32, f32, f32) {
        match plane {
            Plane::Axial => (u, v, p),
            Plane::Coronal => (u, p, v),
            Plane::Sagittal => (p, u, v),
        }
    }

    /// Normalized display intensity on an orthogonal plane, under the
    /// volume's default window.
    pub fn sample_plane(&self, plane: Plane, position: f32, u: f32, v: f32) -> f32 {
        self.sample_plane_windowed(plane, position, u, v, &self.window)
    }

    fn sample_plane_windowed(
        &self,
        plane: Plane,
        position: f32,
        u: f32,
        v: f32,
        window: &WindowLevel,
    ) -> f32 {
        let (x, y, z) = Self::plane_coordinate(plane, position, u, v);
        window.normalize(self.rescale(self.sample_trilinear(x, y, z)))
    }

    /// Render an orthogonal plane to a grayscale image.
    pub fn render_plane(
        &self,
        plane: Plane,
        position: f32,
        window: &WindowLevel,
        out_width: u32,
        out_height: u32,
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let pixels: Vec<u8> = (0..out_height)
            .into_par_iter()
            .flat_map(|py| {
                (0..out_width)
                    .map(|px| {
                        let u = (px as f32 + 0.5) / out_width as f32;
                        let v = (py as f32 + 0.5) / out_height as f32;
                        Self::to_u8(self.sample_plane_windowed(plane, position, u, v, window))
                    })
                    .collect::<Vec<u8>>()
            })
            .collect();

        ImageBuffer::from_raw(out_width, out_height, pixels)
    }

    /// Render an orthogonal plane with a crosshair overlay at the given
    /// normalized screen position.
    pub fn render_plane_with_crosshair(
        &self,
        plane: Plane,
        position: f32,
        window: &WindowLevel,
        out_width: u32,
        out_height: u32,
        crosshair: (f32, f32),
    ) -> Option<ImageBuffer<Rgba<u8>, Vec<u8>>> {
        // One output pixel of proximity in each direction.
        let eps_u = 1.0 / out_width as f32;
        let eps_v = 1.0 / out_height as f32;

        let pixels: Vec<u8> = (0..out_height)
            .into_par_iter()
            .flat_map(|py| {
                (0..out_width)
                    .flat_map(|px| {
                        let u = (px as f32 + 0.5) / out_width as f32;
                        let v = (py as f32 + 0.5) / out_height as f32;
                        let gray =
                            Self::to_u8(self.sample_plane_windowed(plane, position, u, v, window));
                        let mut rgba = [gray, gray, gray, 255];
                        if (u - crosshair.0).abs() < eps_u || (v - crosshair.1).abs() < eps_v {
                            for (channel, highlight) in rgba.iter_mut().zip(CROSSHAIR_COLOR.iter())
                            {
                                *channel = Self::blend(*channel, *highlight, CROSSHAIR_BLEND);
                            }
                        }
                        rgba
                    })
                    .collect::<Vec<u8>>()
            })
            .collect();

        ImageBuffer::from_raw(out_width, out_height, pixels)
    }

    #[inline]
    fn to_index(coord: f32, len: usize) -> usize {
        ((coord.clamp(0.0, 1.0) * (len - 1) as f32).round() as usize).min(len - 1)
    }

    #[inline]
    pub(crate) fn to_u8(normalized: f32) -> u8 {
        (normalized * 255.0).clamp(0.0, 255.0).round() as u8
    }

    #[inline]
    fn blend(base: u8, over: u8, t: f32) -> u8 {
        ((base as f32).mul_add(1.0 - t, over as f32 * t)).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_volume() -> VolumeField {
        // data[z, y, x] = z * 100 + y * 10 + x over a 4x4x4 grid
        let data = Array3::from_shape_fn((4, 4, 4), |(z, y, x)| (z * 100 + y * 10 + x) as u16);
        VolumeField::new(
            data,
            (1.0, 1.0, 1.0),
            1.0,
            0.0,
            WindowLevel::new(150.0, 300.0),
            16,
        )
    }

    #[test]
    fn trilinear_matches_voxels_at_grid_points() {
        let volume = gradient_volume();
        assert_eq!(volume.sample_trilinear(0.0, 0.0, 0.0), 0.0);
        assert_eq!(volume.sample_trilinear(1.0, 1.0, 1.0), 333.0);
        // x = 2/3 lands exactly on voxel index 2
        let v = volume.sample_trilinear(2.0 / 3.0, 0.0, 0.0);
        assert!((v - 2.0).abs() < 1e-4);
    }

    #[test]
    fn trilinear_interpolates_midpoints() {
        let volume = gradient_volume();
        // halfway between voxel x=0 and x=1 on the first row
        let v = volume.sample_trilinear(1.0 / 6.0, 0.0, 0.0);
        assert!((v - 0.5).abs() < 1e-4);
    }

    #[test]
    fn sampling_clamps_out_of_range_coordinates() {
        let volume = gradient_volume();
        assert_eq!(
            volume.sample_trilinear(-2.0, -1.0, -1.0),
            volume.sample_trilinear(0.0, 0.0, 0.0)
        );
        assert_eq!(
            volume.sample_nearest(4.0, 4.0, 4.0),
            volume.sample_nearest(1.0, 1.0, 1.0)
        );
    }

    #[test]
    fn plane_coordinates_fix_the_expected_axis() {
        assert_eq!(
            VolumeField::plane_coordinate(Plane::Axial, 0.3, 0.1, 0.2),
            (0.1, 0.2, 0.3)
        );
        assert_eq!(
            VolumeField::plane_coordinate(Plane::Coronal, 0.3, 0.1, 0.2),
            (0.1, 0.3, 0.2)
        );
        assert_eq!(
            VolumeField::plane_coordinate(Plane::Sagittal, 0.3, 0.1, 0.2),
            (0.3, 0.1, 0.2)
        );
    }

    #[test]
    fn render_plane_has_requested_dimensions() {
        let volume = gradient_volume();
        let window = volume.window();
        let image = volume
            .render_plane(Plane::Axial, 0.5, &window, 16, 8)
            .unwrap();
        assert_eq!(image.dimensions(), (16, 8));
    }

    #[test]
    fn crosshair_changes_pixels_near_its_lines() {
        let volume = gradient_volume();
        let window = volume.window();
        let plain = volume
            .render_plane(Plane::Axial, 0.5, &window, 32, 32)
            .unwrap();
        let overlaid = volume
            .render_plane_with_crosshair(Plane::Axial, 0.5, &window, 32, 32, (0.5, 0.5))
            .unwrap();
        let on_line = overlaid.get_pixel(16, 3).0;
        let gray = plain.get_pixel(16, 3).0[0];
        assert_ne!([gray, gray, gray, 255], on_line);
        // far from both crosshair lines the image is untouched grayscale
        let off_line = overlaid.get_pixel(3, 3).0;
        let gray = plain.get_pixel(3, 3).0[0];
        assert_eq!([gray, gray, gray, 255], off_line);
    }
}
