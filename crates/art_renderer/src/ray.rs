//! Camera rays as seen by the film.
//!
//! Besides the geometric ray, the ray marcher records the raw (not color
//! mapped) field values it integrated along the way. The film folds those
//! into its raw integral channels.

use art_math::Ray;

/// A primary ray plus the raw field integrals gathered while marching it.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedRay {
    /// Geometric ray generated by the camera
    pub ray: Ray,
    /// One running integral per field of the active field set
    pub raw_vals: Vec<f32>,
}

impl TracedRay {
    /// Create a traced ray with all raw integrals at zero.
    pub fn new(ray: Ray, num_channels: usize) -> Self {
        Self {
            ray,
            raw_vals: vec![0.0; num_channels],
        }
    }

    /// Number of raw channels carried.
    pub fn num_channels(&self) -> usize {
        self.raw_vals.len()
    }

    /// Add `vals * step` to the running integrals.
    ///
    /// Extra values beyond the channel count are ignored.
    pub fn accumulate(&mut self, vals: &[f32], step: f32) {
        for (raw, val) in self.raw_vals.iter_mut().zip(vals) {
            *raw += val * step;
        }
    }
}
