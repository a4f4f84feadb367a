//! Parallel sampling driver.
//!
//! `render_film` jitters camera samples over a region, hands each one to a
//! `SampleSource` (the integrator: camera rays plus volume marching) and
//! accumulates the result into a shared `Film`. Buckets run in parallel on
//! the rayon pool; the film serializes overlapping pixel writes.

use art_core::config::RenderSettings;
use art_math::{CameraSample, Color, PixelBounds};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::bucket::{generate_buckets, Bucket};
use crate::film::Film;
use crate::ray::TracedRay;

/// Produces radiance and raw field integrals for camera samples.
pub trait SampleSource: Sync {
    /// Trace one sample. `None` when the ray contributes nothing.
    fn trace(&self, sample: &CameraSample) -> Option<(Color, TracedRay)>;
}

/// Counters returned by a render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub buckets: usize,
    /// Samples handed to the film
    pub samples: u64,
    /// Samples the source returned nothing for
    pub misses: u64,
}

impl RenderStats {
    fn merge(self, other: RenderStats) -> RenderStats {
        RenderStats {
            buckets: self.buckets + other.buckets,
            samples: self.samples + other.samples,
            misses: self.misses + other.misses,
        }
    }
}

/// Sample every raster position of `region` into `film` in parallel.
pub fn render_film(
    film: &Film,
    source: &dyn SampleSource,
    settings: &RenderSettings,
    region: PixelBounds,
) -> RenderStats {
    let buckets = generate_buckets(region, settings.bucket_size);
    log::info!(
        "Rendering {} buckets over {:?} at {} spp",
        buckets.len(),
        region,
        settings.samples_per_pixel
    );

    let stats = buckets
        .par_iter()
        .map(|bucket| render_bucket(film, source, bucket, settings))
        .reduce(RenderStats::default, RenderStats::merge);

    log::debug!(
        "{} samples added, {} misses",
        stats.samples,
        stats.misses
    );
    stats
}

/// Sample one bucket.
///
/// Each bucket draws from its own RNG seeded from the render seed and the
/// bucket index, so results do not depend on thread scheduling.
pub fn render_bucket(
    film: &Film,
    source: &dyn SampleSource,
    bucket: &Bucket,
    settings: &RenderSettings,
) -> RenderStats {
    let mut rng = StdRng::seed_from_u64(settings.seed ^ bucket.index as u64);
    let thread_num = rayon::current_thread_index().unwrap_or(0);
    let mut stats = RenderStats {
        buckets: 1,
        ..RenderStats::default()
    };

    let b = bucket.bounds;
    for y in b.y0..b.y1 {
        for x in b.x0..b.x1 {
            for _ in 0..settings.samples_per_pixel {
                let sample = jittered_sample(x, y, &mut rng);
                match source.trace(&sample) {
                    Some((l, ray)) => {
                        film.add_sample(&sample, l, &ray, thread_num);
                        stats.samples += 1;
                    }
                    None => stats.misses += 1,
                }
            }
        }
    }

    stats
}

/// Uniform sample inside the cell centered on raster position `(x, y)`.
fn jittered_sample(x: i32, y: i32, rng: &mut impl Rng) -> CameraSample {
    CameraSample::at(x as f32 + rng.gen::<f32>() - 0.5, y as f32 + rng.gen::<f32>() - 0.5)
        .with_lens(rng.gen(), rng.gen())
        .with_time(rng.gen())
}
