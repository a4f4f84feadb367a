//! Bucket partitioning of the sampling region.
//!
//! The sampling region is cut into square tiles (buckets) that are rendered
//! independently and in parallel with rayon. Buckets are ordered center-out
//! so a progressive preview fills in the middle of the frame first.

use art_math::PixelBounds;

/// Default bucket edge length in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// A rectangular tile of the sampling region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Raster positions covered, half-open
    pub bounds: PixelBounds,
    /// Position of this bucket in render order
    pub index: usize,
}

impl Bucket {
    pub fn new(bounds: PixelBounds, index: usize) -> Self {
        Self { bounds, index }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> usize {
        self.bounds.area()
    }
}

/// Tile `region` into buckets, sorted in spiral order from its center.
pub fn generate_buckets(region: PixelBounds, bucket_size: u32) -> Vec<Bucket> {
    if region.is_empty() {
        return Vec::new();
    }

    let size = bucket_size.max(1) as i32;
    let mut buckets = Vec::new();

    let mut y = region.y0;
    while y < region.y1 {
        let mut x = region.x0;
        while x < region.x1 {
            let bounds = PixelBounds::new(x, (x + size).min(region.x1), y, (y + size).min(region.y1));
            buckets.push(Bucket::new(bounds, buckets.len()));
            x += size;
        }
        y += size;
    }

    sort_spiral(&mut buckets, &region);

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from the region center.
fn sort_spiral(buckets: &mut [Bucket], region: &PixelBounds) {
    let center_x = (region.x0 + region.x1) as f32 / 2.0;
    let center_y = (region.y0 + region.y1) as f32 / 2.0;

    let distance = |b: &Bucket| {
        let cx = (b.bounds.x0 + b.bounds.x1) as f32 / 2.0;
        let cy = (b.bounds.y0 + b.bounds.y1) as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };

    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Band `index` of `parts` equal horizontal bands of `region`, top first.
pub fn split_rows(region: PixelBounds, parts: u32, index: u32) -> PixelBounds {
    let parts = parts.max(1) as i64;
    let index = (index as i64).min(parts - 1);
    let height = region.height() as i64;
    let y0 = region.y0 + (height * index / parts) as i32;
    let y1 = region.y0 + (height * (index + 1) / parts) as i32;
    PixelBounds::new(region.x0, region.x1, y0, y1)
}
