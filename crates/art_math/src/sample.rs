/// Sample values needed to generate a primary camera ray.
///
/// `image_x`/`image_y` are continuous raster coordinates where pixel `(i, j)`
/// is centered on `(i as f32, j as f32)`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CameraSample {
    pub image_x: f32,
    pub image_y: f32,
    pub lens_u: f32,
    pub lens_v: f32,
    pub time: f32,
}

impl CameraSample {
    /// Create a sample at an image position with a centered lens and time 0.
    pub fn at(image_x: f32, image_y: f32) -> Self {
        Self {
            image_x,
            image_y,
            lens_u: 0.5,
            lens_v: 0.5,
            time: 0.0,
        }
    }

    /// Set lens coordinates (used by cameras with a finite aperture).
    pub fn with_lens(mut self, u: f32, v: f32) -> Self {
        self.lens_u = u;
        self.lens_v = v;
        self
    }

    /// Set the shutter time of the sample.
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }
}
