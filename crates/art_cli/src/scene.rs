//! Analytic test volume and an orthographic ray marcher over it.
//!
//! The volume is a rotating gaussian gas blob filling the cube `[-1, 1]^3`.
//! It provides a value for every `Field`, so any field profile and any
//! transfer function directive has something to show.

use art_core::{Field, FieldSet};
use art_math::{CameraSample, Color, PixelBounds, Ray, Vec3};
use art_renderer::{SampleSource, TracedRay, TransferFunction};

/// Half edge length of the cubic domain centered on the origin.
const DOMAIN_HALF_SIZE: f32 = 1.0;

/// Width of the gaussian density profile.
const BLOB_RADIUS: f32 = 0.35;

/// Value of a field at a point of the test volume.
pub fn field_value(field: Field, p: Vec3) -> f32 {
    let r = p.length();
    let density = (-r * r / (2.0 * BLOB_RADIUS * BLOB_RADIUS)).exp();
    let utherm = 1.0 / (0.2 + r);
    // Solid body rotation about z, scaled by density
    let vel = Vec3::new(-p.y, p.x, 0.0) * density;

    match field {
        Field::Density => density,
        Field::Utherm => utherm,
        Field::Pressure => (2.0 / 3.0) * density * utherm,
        Field::Energy => 0.5 * vel.length_squared() + utherm,
        Field::VelX => vel.x,
        Field::VelY => vel.y,
        Field::VelZ => vel.z,
        Field::VelDiv => 0.0,
        Field::VelCurl => 2.0 * density,
        Field::Potential => -1.0 / (0.3 + r),
        Field::Metallicity => 0.02 * (1.0 - r).max(0.0),
        Field::ElectronFraction => 1.16,
        Field::Sfr => {
            if density > 0.8 {
                density
            } else {
                0.0
            }
        }
        Field::Entropy => (2.0 / 3.0) * utherm / density.max(1e-6).powf(2.0 / 3.0),
        Field::BMag => 0.1 * density,
        Field::ShockHeating => 0.0,
    }
}

/// Fill `vals` with every field of `fields` at `p`.
pub fn sample_fields(fields: &FieldSet, p: Vec3, vals: &mut [f32]) {
    for (val, field) in vals.iter_mut().zip(fields.iter()) {
        *val = field_value(field, p);
    }
}

/// Orthographic camera looking down +z onto a screen window.
#[derive(Debug, Clone, Copy)]
pub struct OrthoCamera {
    /// `[x_min, x_max, y_min, y_max]` in world units
    window: [f32; 4],
    x_resolution: f32,
    /// Raster rows the window spans
    rows: PixelBounds,
}

impl OrthoCamera {
    pub fn new(window: [f32; 4], x_resolution: u32, rows: PixelBounds) -> Self {
        Self {
            window,
            x_resolution: x_resolution as f32,
            rows,
        }
    }

    /// Ray for a raster sample; raster y grows downwards.
    pub fn generate_ray(&self, sample: &CameraSample) -> Ray {
        let [x_min, x_max, y_min, y_max] = self.window;
        let u = (sample.image_x + 0.5) / self.x_resolution;
        let v = (sample.image_y - self.rows.y0 as f32 + 0.5) / self.rows.height().max(1) as f32;
        let origin = Vec3::new(
            x_min + u * (x_max - x_min),
            y_max - v * (y_max - y_min),
            -2.0 * DOMAIN_HALF_SIZE,
        );
        Ray::new(origin, Vec3::Z, sample.time)
    }
}

/// Parametric segment of an axis-aligned ray inside the domain.
fn domain_hit(ray: &Ray) -> Option<(f32, f32)> {
    let mut t_min = ray.extent.min;
    let mut t_max = ray.extent.max;
    for axis in 0..3 {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];
        if dir == 0.0 {
            if origin.abs() > DOMAIN_HALF_SIZE {
                return None;
            }
            continue;
        }
        let t0 = (-DOMAIN_HALF_SIZE - origin) / dir;
        let t1 = (DOMAIN_HALF_SIZE - origin) / dir;
        t_min = t_min.max(t0.min(t1));
        t_max = t_max.min(t0.max(t1));
    }
    (t_min < t_max).then_some((t_min, t_max))
}

/// Emission-absorption marcher through the test volume.
pub struct VolumeMarcher<'a> {
    camera: OrthoCamera,
    tf: &'a TransferFunction,
    steps: usize,
}

impl<'a> VolumeMarcher<'a> {
    pub fn new(camera: OrthoCamera, tf: &'a TransferFunction, steps: usize) -> Self {
        Self {
            camera,
            tf,
            steps: steps.max(1),
        }
    }
}

impl SampleSource for VolumeMarcher<'_> {
    fn trace(&self, sample: &CameraSample) -> Option<(Color, TracedRay)> {
        let ray = self.camera.generate_ray(sample);
        let (t_min, t_max) = domain_hit(&ray)?;
        let ray = ray.with_extent(t_min, t_max);

        let fields = self.tf.fields();
        let mut traced = TracedRay::new(ray, fields.len());
        let mut vals = vec![0.0; fields.len()];

        let dt = ray.segment_length() / self.steps as f32;
        let step_transmittance = (-self.tf.sigma_t() * dt).exp();
        let mut transmittance = Color::ONE;
        let mut l = Color::ZERO;

        for i in 0..self.steps {
            let p = ray.at(t_min + (i as f32 + 0.5) * dt);
            sample_fields(fields, p, &mut vals);
            if self.tf.in_range(&vals) {
                l += transmittance * self.tf.lve(&vals) * dt;
            }
            traced.accumulate(&vals, dt);
            transmittance *= step_transmittance;
        }

        Some((l, traced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_peaks_at_center() {
        let center = field_value(Field::Density, Vec3::ZERO);
        assert_eq!(center, 1.0);
        assert!(field_value(Field::Density, Vec3::new(0.5, 0.0, 0.0)) < center);
        assert_eq!(field_value(Field::VelZ, Vec3::new(0.3, 0.2, 0.1)), 0.0);
    }

    #[test]
    fn test_camera_maps_window() {
        let camera = OrthoCamera::new([-1.0, 1.0, -1.0, 1.0], 4, PixelBounds::new(0, 4, 0, 4));
        let ray = camera.generate_ray(&CameraSample::at(-0.5, -0.5));
        assert_eq!(ray.origin.x, -1.0);
        assert_eq!(ray.origin.y, 1.0);
        let ray = camera.generate_ray(&CameraSample::at(3.5, 3.5));
        assert_eq!(ray.origin.x, 1.0);
        assert_eq!(ray.origin.y, -1.0);
    }

    #[test]
    fn test_marcher_hits_and_misses() {
        let mut tf = TransferFunction::new(Color::ZERO, FieldSet::compact());
        tf.add_parse_string("constant Density 1 1 1").unwrap();

        let window = [-2.0, 2.0, -1.0, 1.0];
        let marcher = VolumeMarcher::new(OrthoCamera::new(window, 8, PixelBounds::new(0, 8, 0, 4)), &tf, 16);

        // Center of the image goes through the blob
        let (l, traced) = marcher.trace(&CameraSample::at(3.5, 1.5)).unwrap();
        assert!((l - Color::splat(2.0)).abs().max_element() < 1e-4);
        assert!(traced.raw_vals[0] > 0.0);

        // Far left column is outside the domain
        assert!(marcher.trace(&CameraSample::at(0.0, 1.5)).is_none());
    }
}
