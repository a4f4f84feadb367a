// Re-export glam for convenience
pub use glam::*;

// ART math types
mod bounds;
mod interval;
mod ray;
mod sample;

pub use bounds::PixelBounds;
pub use interval::Interval;
pub use ray::Ray;
pub use sample::CameraSample;

/// RGB color carried by rays and stored in film pixels.
pub type Color = Vec3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_vec3() {
        let c: Color = Color::new(1.0, 0.5, 0.25);
        assert_eq!(c, Vec3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn test_color_scaling() {
        let c = Color::splat(0.5) * 2.0;
        assert_eq!(c, Color::ONE);
    }
}
