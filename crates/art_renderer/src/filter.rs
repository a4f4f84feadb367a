//! Reconstruction filters.
//!
//! A filter weights a sample's contribution to nearby pixels by the offset
//! between the sample position and the pixel center. Every filter has a
//! rectangular support `[-x_width, x_width] x [-y_width, y_width]`; the film
//! only evaluates filters inside that support.

use art_core::FilterSettings;

/// Half-widths of a filter's support and their reciprocals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterExtent {
    pub x_width: f32,
    pub y_width: f32,
    pub inv_x_width: f32,
    pub inv_y_width: f32,
}

impl FilterExtent {
    pub fn new(x_width: f32, y_width: f32) -> Self {
        Self {
            x_width,
            y_width,
            inv_x_width: 1.0 / x_width,
            inv_y_width: 1.0 / y_width,
        }
    }

    /// Returns true if the offset lies inside the support.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x.abs() <= self.x_width && y.abs() <= self.y_width
    }
}

/// Reconstruction kernel evaluated over in-support offsets.
pub trait Filter: Send + Sync {
    /// Support of the filter.
    fn extent(&self) -> &FilterExtent;

    /// Weight for an offset `(x, y)` from the pixel center.
    ///
    /// Callers guarantee `|x| <= x_width` and `|y| <= y_width`.
    fn evaluate(&self, x: f32, y: f32) -> f32;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Constant weight over the whole support.
#[derive(Debug, Clone)]
pub struct BoxFilter {
    extent: FilterExtent,
}

impl BoxFilter {
    pub fn new(x_width: f32, y_width: f32) -> Self {
        log::debug!("BoxFilter({}, {})", x_width, y_width);
        Self {
            extent: FilterExtent::new(x_width, y_width),
        }
    }
}

impl Filter for BoxFilter {
    fn extent(&self) -> &FilterExtent {
        &self.extent
    }

    fn evaluate(&self, _x: f32, _y: f32) -> f32 {
        1.0
    }

    fn name(&self) -> &'static str {
        "box"
    }
}

/// Weight falls off linearly from the center to the support edge.
#[derive(Debug, Clone)]
pub struct TriangleFilter {
    extent: FilterExtent,
}

impl TriangleFilter {
    pub fn new(x_width: f32, y_width: f32) -> Self {
        Self {
            extent: FilterExtent::new(x_width, y_width),
        }
    }
}

impl Filter for TriangleFilter {
    fn extent(&self) -> &FilterExtent {
        &self.extent
    }

    fn evaluate(&self, x: f32, y: f32) -> f32 {
        (self.extent.x_width - x.abs()).max(0.0) * (self.extent.y_width - y.abs()).max(0.0)
    }

    fn name(&self) -> &'static str {
        "triangle"
    }
}

/// Gaussian shifted down so it reaches zero at the support edge.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    extent: FilterExtent,
    alpha: f32,
    exp_x: f32,
    exp_y: f32,
}

impl GaussianFilter {
    pub fn new(x_width: f32, y_width: f32, alpha: f32) -> Self {
        Self {
            extent: FilterExtent::new(x_width, y_width),
            alpha,
            exp_x: (-alpha * x_width * x_width).exp(),
            exp_y: (-alpha * y_width * y_width).exp(),
        }
    }

    fn gaussian(&self, d: f32, expv: f32) -> f32 {
        ((-self.alpha * d * d).exp() - expv).max(0.0)
    }
}

impl Filter for GaussianFilter {
    fn extent(&self) -> &FilterExtent {
        &self.extent
    }

    fn evaluate(&self, x: f32, y: f32) -> f32 {
        self.gaussian(x, self.exp_x) * self.gaussian(y, self.exp_y)
    }

    fn name(&self) -> &'static str {
        "gaussian"
    }
}

/// Mitchell-Netravali cubic. `b + 2c = 1` gives the usual family.
#[derive(Debug, Clone)]
pub struct MitchellFilter {
    extent: FilterExtent,
    b: f32,
    c: f32,
}

impl MitchellFilter {
    pub fn new(x_width: f32, y_width: f32, b: f32, c: f32) -> Self {
        Self {
            extent: FilterExtent::new(x_width, y_width),
            b,
            c,
        }
    }

    /// 1D cubic over `x` in `[-1, 1]`.
    fn mitchell_1d(&self, x: f32) -> f32 {
        let (b, c) = (self.b, self.c);
        let x = (2.0 * x).abs();
        if x > 1.0 {
            ((-b - 6.0 * c) * x * x * x
                + (6.0 * b + 30.0 * c) * x * x
                + (-12.0 * b - 48.0 * c) * x
                + (8.0 * b + 24.0 * c))
                * (1.0 / 6.0)
        } else {
            ((12.0 - 9.0 * b - 6.0 * c) * x * x * x
                + (-18.0 + 12.0 * b + 6.0 * c) * x * x
                + (6.0 - 2.0 * b))
                * (1.0 / 6.0)
        }
    }
}

impl Filter for MitchellFilter {
    fn extent(&self) -> &FilterExtent {
        &self.extent
    }

    fn evaluate(&self, x: f32, y: f32) -> f32 {
        self.mitchell_1d(x * self.extent.inv_x_width) * self.mitchell_1d(y * self.extent.inv_y_width)
    }

    fn name(&self) -> &'static str {
        "mitchell"
    }
}

/// Build the filter selected by a configuration.
pub fn create_filter(settings: &FilterSettings) -> Box<dyn Filter> {
    match *settings {
        FilterSettings::Box { x_width, y_width } => Box::new(BoxFilter::new(x_width, y_width)),
        FilterSettings::Triangle { x_width, y_width } => {
            Box::new(TriangleFilter::new(x_width, y_width))
        }
        FilterSettings::Gaussian {
            x_width,
            y_width,
            alpha,
        } => Box::new(GaussianFilter::new(x_width, y_width, alpha)),
        FilterSettings::Mitchell {
            x_width,
            y_width,
            b,
            c,
        } => Box::new(MitchellFilter::new(x_width, y_width, b, c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_filter_is_constant() {
        let filter = BoxFilter::new(0.5, 0.5);
        assert_eq!(filter.evaluate(0.0, 0.0), 1.0);
        assert_eq!(filter.evaluate(0.5, -0.5), 1.0);
        assert_eq!(filter.evaluate(-0.25, 0.1), 1.0);
    }

    #[test]
    fn test_extent() {
        let filter = BoxFilter::new(2.0, 0.5);
        let extent = filter.extent();
        assert_eq!(extent.inv_x_width, 0.5);
        assert_eq!(extent.inv_y_width, 2.0);
        assert!(extent.contains(2.0, 0.5));
        assert!(!extent.contains(2.1, 0.0));
    }

    #[test]
    fn test_triangle_filter() {
        let filter = TriangleFilter::new(2.0, 2.0);
        assert_eq!(filter.evaluate(0.0, 0.0), 4.0);
        assert_eq!(filter.evaluate(1.0, 0.0), 2.0);
        assert_eq!(filter.evaluate(2.0, 0.0), 0.0);
    }

    #[test]
    fn test_gaussian_filter_falls_off() {
        let filter = GaussianFilter::new(2.0, 2.0, 2.0);
        let center = filter.evaluate(0.0, 0.0);
        let mid = filter.evaluate(1.0, 0.0);
        let edge = filter.evaluate(2.0, 2.0);
        assert!(center > mid);
        assert!(mid > 0.0);
        assert!(edge.abs() < 1e-6);
    }

    #[test]
    fn test_mitchell_filter_shape() {
        let filter = MitchellFilter::new(2.0, 2.0, 1.0 / 3.0, 1.0 / 3.0);
        let center = filter.evaluate(0.0, 0.0);
        assert!(center > 0.0);
        // Reaches zero at the support edge
        assert!(filter.evaluate(2.0, 0.0).abs() < 1e-4);
        // Negative lobe between the center and the edge
        assert!(filter.evaluate(1.5, 0.0) < 0.0);
    }

    #[test]
    fn test_create_filter_from_settings() {
        let filter = create_filter(&FilterSettings::default());
        assert_eq!(filter.name(), "box");
        assert_eq!(filter.extent().x_width, 0.5);

        let filter = create_filter(&FilterSettings::Gaussian {
            x_width: 1.5,
            y_width: 1.0,
            alpha: 2.0,
        });
        assert_eq!(filter.name(), "gaussian");
        assert_eq!(filter.extent().y_width, 1.0);
    }
}
