/// Half-open integer rectangle `[x0, x1) x [y0, y1)` in raster space.
///
/// Used for pixel extents, sample extents and filter footprints. Bounds with
/// `x1 <= x0` or `y1 <= y0` are empty.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: i32,
    pub x1: i32,
    pub y0: i32,
    pub y1: i32,
}

impl PixelBounds {
    /// Create bounds from start (inclusive) and end (exclusive) corners.
    pub fn new(x0: i32, x1: i32, y0: i32, y1: i32) -> Self {
        Self { x0, x1, y0, y1 }
    }

    /// Create bounds from a start corner and a pixel count per axis.
    pub fn from_origin(x0: i32, y0: i32, width: i32, height: i32) -> Self {
        Self::new(x0, x0 + width, y0, y0 + height)
    }

    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Returns true if the pixel `(x, y)` lies inside the bounds.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Returns true if `other` lies entirely inside these bounds.
    pub fn contains_bounds(&self, other: &PixelBounds) -> bool {
        other.is_empty()
            || (other.x0 >= self.x0
                && other.x1 <= self.x1
                && other.y0 >= self.y0
                && other.y1 <= self.y1)
    }

    /// Overlap of two bounds (may be empty).
    pub fn intersect(&self, other: &PixelBounds) -> PixelBounds {
        PixelBounds::new(
            self.x0.max(other.x0),
            self.x1.min(other.x1),
            self.y0.max(other.y0),
            self.y1.min(other.y1),
        )
    }
}
