use crate::{Interval, Vec3};

/// A primary ray traced through the simulation domain.
///
/// `extent` is the parametric segment `[t_min, t_max]` the ray marcher walks;
/// cameras hand out rays covering `[0, inf)` and the marcher narrows it to the
/// part of the ray that lies inside the domain.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub time: f32,
    pub extent: Interval,
}

impl Ray {
    /// Create a new ray covering `[0, inf)`.
    pub fn new(origin: Vec3, direction: Vec3, time: f32) -> Self {
        Self {
            origin,
            direction,
            time,
            extent: Interval::new(0.0, f32::INFINITY),
        }
    }

    /// Restrict the ray to the parametric segment `[t_min, t_max]`.
    pub fn with_extent(mut self, t_min: f32, t_max: f32) -> Self {
        self.extent = Interval::new(t_min, t_max);
        self
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Parametric length of the marched segment, zero for an empty extent.
    pub fn segment_length(&self) -> f32 {
        self.extent.size().max(0.0)
    }
}
