//! ART Renderer - sample reconstruction and transfer functions.
//!
//! The two pieces every ART render runs through:
//!
//! - **Film**: reconstruction filters and the pixel buffers that accumulate
//!   filtered radiance, splats and raw field integrals from many threads
//! - **Transfer functions**: per-field mappings from simulation values to
//!   emitted color, built from code or from text directives
//!
//! Plus a rayon driver that fills a film from any `SampleSource`.
//!
//! # Example
//!
//! ```ignore
//! use art_renderer::{create_filter, render_film, Film, TransferFunction};
//!
//! let fields = config.fields.to_field_set()?;
//! let mut tf = TransferFunction::from_settings(&config.transfer, fields.clone());
//! tf.add_parse_string("gaussian Density 0.5 0.1 1 0.5 0")?;
//!
//! let film = Film::from_settings(&config.film, create_filter(&config.filter), &fields);
//! render_film(&film, &marcher, &config.render, film.get_sample_extent());
//! film.write_image(0, config.render.splat_scale)?;
//! ```

mod bucket;
mod film;
mod filter;
mod ray;
mod renderer;
mod transfer;
mod transfer_function;

pub use bucket::{generate_buckets, split_rows, Bucket, DEFAULT_BUCKET_SIZE};
pub use film::{
    color_to_rgb8, linear_to_gamma, Film, FilmError, FilmResult, IntegralsHeader, Pixel,
    RawPixel, FILTER_TABLE_SIZE,
};
pub use filter::{
    create_filter, BoxFilter, Filter, FilterExtent, GaussianFilter, MitchellFilter,
    TriangleFilter,
};
pub use ray::TracedRay;
pub use renderer::{render_bucket, render_film, RenderStats, SampleSource};
pub use transfer::{
    DiscreteTable, Knot, TransferFunc1D, TransferKind, TransferShape, GAUSSIAN_RANGE_SIGMAS,
};
pub use transfer_function::{TransferError, TransferFunction, TransferResult};

/// Re-export the math types used in this crate's API
pub use art_math::{CameraSample, Color, Interval, PixelBounds, Ray, Vec3};
