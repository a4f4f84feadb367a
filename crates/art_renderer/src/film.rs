//! Film: reconstructs image samples into pixels.
//!
//! The film owns two parallel pixel grids over its pixel extent:
//!
//! - color pixels accumulating filter-weighted radiance, the filter weight
//!   sum and unweighted splats
//! - raw pixels accumulating the un-color-mapped field integrals carried by
//!   each ray, for scientific export
//!
//! Pixel `(i, j)` is centered on the continuous raster position `(i, j)`.
//! Each grid row sits behind its own lock, so `add_sample`, `splat` and
//! `draw_line` can be called from many render threads at once; the writers
//! expect all rendering to have finished.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use art_core::config::FilmSettings;
use art_core::FieldSet;
use art_math::{CameraSample, Color, PixelBounds};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::split_rows;
use crate::filter::Filter;
use crate::ray::TracedRay;

/// Resolution of the precomputed filter table along each axis.
pub const FILTER_TABLE_SIZE: usize = 16;

/// Errors that can occur while writing film outputs.
#[derive(Error, Debug)]
pub enum FilmError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to encode integrals header: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FilmResult<T> = Result<T, FilmError>;

/// Accumulated color state of one pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pixel {
    /// Sum of filter-weighted radiance
    pub l: Color,
    /// Sum of filter weights
    pub weight_sum: f32,
    /// Sum of unweighted splat contributions
    pub splat: Color,
}

impl Pixel {
    /// Radiance divided by the weight sum, zero if nothing was added.
    pub fn normalized(&self) -> Color {
        if self.weight_sum != 0.0 {
            self.l / self.weight_sum
        } else {
            Color::ZERO
        }
    }

    /// Display value: normalized radiance plus scaled splats.
    pub fn resolve(&self, splat_scale: f32) -> Color {
        self.normalized() + self.splat * splat_scale
    }
}

/// Accumulated raw field integrals of one pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPixel {
    pub raw_vals: Vec<f32>,
    pub weight_sum: f32,
}

impl RawPixel {
    /// Raw values divided by the weight sum, zeros if nothing was added.
    pub fn normalized(&self) -> Vec<f32> {
        if self.weight_sum != 0.0 {
            self.raw_vals.iter().map(|v| v / self.weight_sum).collect()
        } else {
            vec![0.0; self.raw_vals.len()]
        }
    }
}

/// One row of both pixel grids.
struct FilmRow {
    pixels: Vec<Pixel>,
    /// `width * num_channels` raw sums, pixel-major
    raw_vals: Vec<f32>,
    raw_weights: Vec<f32>,
    num_channels: usize,
}

impl FilmRow {
    fn new(width: usize, num_channels: usize) -> Self {
        Self {
            pixels: vec![Pixel::default(); width],
            raw_vals: vec![0.0; width * num_channels],
            raw_weights: vec![0.0; width],
            num_channels,
        }
    }

    fn add_weighted(&mut self, i: usize, l: Color, weight: f32, raw: &[f32]) {
        let pixel = &mut self.pixels[i];
        pixel.l += l * weight;
        pixel.weight_sum += weight;

        let start = i * self.num_channels;
        let channels = &mut self.raw_vals[start..start + self.num_channels];
        for (sum, val) in channels.iter_mut().zip(raw) {
            *sum += val * weight;
        }
        self.raw_weights[i] += weight;
    }

    fn raw_pixel(&self, i: usize) -> RawPixel {
        let start = i * self.num_channels;
        RawPixel {
            raw_vals: self.raw_vals[start..start + self.num_channels].to_vec(),
            weight_sum: self.raw_weights[i],
        }
    }
}

/// Layout description written next to the raw integrals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralsHeader {
    pub width: u32,
    pub height: u32,
    pub x_start: i32,
    pub y_start: i32,
    /// Channel names in file order
    pub channels: Vec<String>,
    pub dtype: String,
    pub byte_order: String,
    /// `channel-major`: all pixels of channel 0, then channel 1, ...
    pub layout: String,
}

/// Image reconstruction target shared by all render threads.
pub struct Film {
    pub x_resolution: u32,
    pub y_resolution: u32,
    filter: Box<dyn Filter>,
    crop_window: [f64; 4],
    filename: PathBuf,
    pixel_bounds: PixelBounds,
    channel_names: Vec<&'static str>,
    rows: Vec<Mutex<FilmRow>>,
    filter_table: Vec<f32>,
    preview: Option<Vec<Color>>,
    total_jobs: u32,
    thread_samples: Vec<AtomicU64>,
}

impl Film {
    /// Create an uncropped film with default output settings.
    pub fn new(x_resolution: u32, y_resolution: u32, filter: Box<dyn Filter>, fields: &FieldSet) -> Self {
        let settings = FilmSettings {
            x_resolution,
            y_resolution,
            ..FilmSettings::default()
        };
        Self::from_settings(&settings, filter, fields)
    }

    /// Create a film from configuration. Raw channels follow `fields`.
    pub fn from_settings(settings: &FilmSettings, filter: Box<dyn Filter>, fields: &FieldSet) -> Self {
        let x_resolution = settings.x_resolution.max(1);
        let y_resolution = settings.y_resolution.max(1);
        let crop = settings.crop_window;

        let (x_start, x_count) = crop_axis(x_resolution, crop[0], crop[1]);
        let (y_start, y_count) = crop_axis(y_resolution, crop[2], crop[3]);
        let pixel_bounds = PixelBounds::from_origin(x_start, y_start, x_count, y_count);

        let num_channels = fields.len();
        let rows = (0..y_count)
            .map(|_| Mutex::new(FilmRow::new(x_count as usize, num_channels)))
            .collect();

        let filter_table = build_filter_table(filter.as_ref());

        let preview = settings
            .open_window
            .then(|| vec![Color::ZERO; pixel_bounds.area()]);

        let num_threads = match settings.num_threads {
            0 => rayon::current_num_threads(),
            n => n,
        };
        let thread_samples = (0..num_threads.max(1)).map(|_| AtomicU64::new(0)).collect();

        log::debug!(
            "Film({}x{}) pixels {:?}, {} filter ({} x {}), {} raw channels",
            x_resolution,
            y_resolution,
            pixel_bounds,
            filter.name(),
            filter.extent().x_width,
            filter.extent().y_width,
            num_channels
        );

        Self {
            x_resolution,
            y_resolution,
            filter,
            crop_window: crop,
            filename: PathBuf::from(&settings.filename),
            pixel_bounds,
            channel_names: fields.names(),
            rows,
            filter_table,
            preview,
            total_jobs: settings.total_jobs.max(1),
            thread_samples,
        }
    }

    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    pub fn crop_window(&self) -> [f64; 4] {
        self.crop_window
    }

    /// Output file stem.
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn num_channels(&self) -> usize {
        self.channel_names.len()
    }

    /// Discretized filter weights, `FILTER_TABLE_SIZE` rows of
    /// `FILTER_TABLE_SIZE` entries over the positive quadrant of the support.
    pub fn filter_table(&self) -> &[f32] {
        &self.filter_table
    }

    /// Pixels a sample at `sample`'s image position contributes to.
    fn footprint(&self, sample: &CameraSample) -> PixelBounds {
        let extent = self.filter.extent();
        let x0 = (sample.image_x - extent.x_width).ceil() as i32;
        let x1 = ((sample.image_x + extent.x_width).floor() as i32).saturating_add(1);
        let y0 = (sample.image_y - extent.y_width).ceil() as i32;
        let y1 = ((sample.image_y + extent.y_width).floor() as i32).saturating_add(1);
        PixelBounds::new(x0, x1, y0, y1).intersect(&self.pixel_bounds)
    }

    /// Add a filtered sample.
    ///
    /// Every pixel within the filter support around the sample receives
    /// `weight * l` and `weight`, and its raw channels receive
    /// `weight * ray.raw_vals`. Footprints are clipped to the pixel extent.
    pub fn add_sample(&self, sample: &CameraSample, l: Color, ray: &TracedRay, thread_num: usize) {
        if let Some(count) = self.thread_samples.get(thread_num % self.thread_samples.len()) {
            count.fetch_add(1, Ordering::Relaxed);
        }

        let footprint = self.footprint(sample);
        if footprint.is_empty() {
            return;
        }

        let extent = *self.filter.extent();
        for y in footprint.y0..footprint.y1 {
            let fy = table_index(y as f32 - sample.image_y, extent.inv_y_width);
            let mut row = self.rows[(y - self.pixel_bounds.y0) as usize].lock();
            for x in footprint.x0..footprint.x1 {
                let fx = table_index(x as f32 - sample.image_x, extent.inv_x_width);
                let weight = self.filter_table[fy * FILTER_TABLE_SIZE + fx];
                row.add_weighted((x - self.pixel_bounds.x0) as usize, l, weight, &ray.raw_vals);
            }
        }
    }

    /// Add `l` unweighted to the splat sum of every pixel in the footprint.
    pub fn splat(&self, sample: &CameraSample, l: Color) {
        let footprint = self.footprint(sample);
        if footprint.is_empty() {
            return;
        }

        for y in footprint.y0..footprint.y1 {
            let mut row = self.rows[(y - self.pixel_bounds.y0) as usize].lock();
            for x in footprint.x0..footprint.x1 {
                row.pixels[(x - self.pixel_bounds.x0) as usize].splat += l;
            }
        }
    }

    /// Raster region samples must cover so every pixel gets its full filter support.
    pub fn get_sample_extent(&self) -> PixelBounds {
        let extent = self.filter.extent();
        let b = self.pixel_bounds;
        PixelBounds::new(
            (b.x0 as f32 + 0.5 - extent.x_width).floor() as i32,
            (b.x1 as f32 - 0.5 + extent.x_width).ceil() as i32,
            (b.y0 as f32 + 0.5 - extent.y_width).floor() as i32,
            (b.y1 as f32 - 0.5 + extent.y_width).ceil() as i32,
        )
    }

    /// Pixels stored by the film (the cropped image).
    pub fn get_pixel_extent(&self) -> PixelBounds {
        self.pixel_bounds
    }

    /// Copy of a pixel, `None` outside the pixel extent.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Pixel> {
        if !self.pixel_bounds.contains(x, y) {
            return None;
        }
        let row = self.rows[(y - self.pixel_bounds.y0) as usize].lock();
        Some(row.pixels[(x - self.pixel_bounds.x0) as usize])
    }

    /// Copy of a pixel's raw channels, `None` outside the pixel extent.
    pub fn raw_pixel(&self, x: i32, y: i32) -> Option<RawPixel> {
        if !self.pixel_bounds.contains(x, y) {
            return None;
        }
        let row = self.rows[(y - self.pixel_bounds.y0) as usize].lock();
        Some(row.raw_pixel((x - self.pixel_bounds.x0) as usize))
    }

    /// Total samples added through `add_sample`.
    pub fn samples_added(&self) -> u64 {
        self.thread_samples
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Refresh the preview buffer over `[x0, x1) x [y0, y1)`.
    ///
    /// Does nothing when the film was created without a preview window.
    pub fn update_display(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, splat_scale: f32) {
        let bounds = self.pixel_bounds;
        let Some(preview) = self.preview.as_mut() else {
            return;
        };

        let region = PixelBounds::new(x0, x1, y0, y1).intersect(&bounds);
        let width = bounds.width() as usize;
        for y in region.y0..region.y1 {
            let row = self.rows[(y - bounds.y0) as usize].get_mut();
            let offset = (y - bounds.y0) as usize * width;
            for x in region.x0..region.x1 {
                let i = (x - bounds.x0) as usize;
                preview[offset + i] = row.pixels[i].resolve(splat_scale);
            }
        }
    }

    /// Preview buffer, row-major over the pixel extent.
    pub fn preview(&self) -> Option<&[Color]> {
        self.preview.as_deref()
    }

    /// Display values for the whole pixel extent, row-major.
    pub fn image_buffer(&self, splat_scale: f32) -> Vec<Color> {
        self.collect_rows(|row| {
            row.pixels
                .iter()
                .map(|p| p.resolve(splat_scale))
                .collect()
        })
    }

    /// Normalized radiance without splats, row-major.
    pub fn raw_rgb_buffer(&self) -> Vec<Color> {
        self.collect_rows(|row| row.pixels.iter().map(Pixel::normalized).collect())
    }

    /// Normalized raw integrals, one row-major buffer per channel.
    pub fn integral_buffers(&self) -> Vec<Vec<f32>> {
        let area = self.pixel_bounds.area();
        let mut buffers = vec![Vec::with_capacity(area); self.num_channels()];
        for row in &self.rows {
            let row = row.lock();
            for i in 0..row.pixels.len() {
                let values = row.raw_pixel(i).normalized();
                for (buffer, value) in buffers.iter_mut().zip(values) {
                    buffer.push(value);
                }
            }
        }
        buffers
    }

    fn collect_rows<T>(&self, f: impl Fn(&FilmRow) -> Vec<T>) -> Vec<T> {
        let mut out = Vec::with_capacity(self.pixel_bounds.area());
        for row in &self.rows {
            let row = row.lock();
            out.extend(f(&*row));
        }
        out
    }

    /// Write the final image as `<stem>_<frame>.png`.
    pub fn write_image(&self, frame_num: u32, splat_scale: f32) -> FilmResult<PathBuf> {
        let path = self.output_path(&format!("_{:04}", frame_num), "png");
        ensure_parent(&path)?;

        let (width, height) = self.output_size();
        let colors = self.image_buffer(splat_scale);
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb(color_to_rgb8(colors[(y * width + x) as usize]))
        });
        img.save(&path)?;

        log::info!(
            "Wrote image {} ({}x{}, {} samples)",
            path.display(),
            width,
            height,
            self.samples_added()
        );
        for (thread, count) in self.thread_samples.iter().enumerate() {
            log::debug!("  thread {}: {} samples", thread, count.load(Ordering::Relaxed));
        }
        Ok(path)
    }

    /// Write normalized radiance without splats as `<stem>_raw.exr`.
    pub fn write_raw_rgb(&self) -> FilmResult<PathBuf> {
        let path = self.output_path("_raw", "exr");
        ensure_parent(&path)?;

        let (width, height) = self.output_size();
        let colors = self.raw_rgb_buffer();
        let img = image::Rgb32FImage::from_fn(width, height, |x, y| {
            image::Rgb(colors[(y * width + x) as usize].to_array())
        });
        img.save(&path)?;

        log::info!("Wrote raw RGB {}", path.display());
        Ok(path)
    }

    /// Write the normalized raw integrals as `<stem>_integrals.bin` plus a
    /// JSON header `<stem>_integrals.json`. Returns the data path.
    pub fn write_integrals(&self) -> FilmResult<PathBuf> {
        let bin_path = self.output_path("_integrals", "bin");
        let json_path = self.output_path("_integrals", "json");
        ensure_parent(&bin_path)?;

        let data: Vec<f32> = self.integral_buffers().concat();
        std::fs::write(&bin_path, bytemuck::cast_slice::<f32, u8>(&data)).map_err(|source| {
            FilmError::Io {
                path: bin_path.clone(),
                source,
            }
        })?;

        let (width, height) = self.output_size();
        let header = IntegralsHeader {
            width,
            height,
            x_start: self.pixel_bounds.x0,
            y_start: self.pixel_bounds.y0,
            channels: self.channel_names.iter().map(|s| s.to_string()).collect(),
            dtype: "f32".to_string(),
            byte_order: if cfg!(target_endian = "little") {
                "little".to_string()
            } else {
                "big".to_string()
            },
            layout: "channel-major".to_string(),
        };
        std::fs::write(&json_path, serde_json::to_string_pretty(&header)?).map_err(|source| {
            FilmError::Io {
                path: json_path.clone(),
                source,
            }
        })?;

        log::info!(
            "Wrote {} raw channels to {}",
            header.channels.len(),
            bin_path.display()
        );
        Ok(bin_path)
    }

    /// Screen window `[x_min, x_max, y_min, y_max]` rendered by one job.
    ///
    /// The full window spans `[-1, 1]` along the shorter image axis and keeps
    /// the aspect ratio along the longer one. With several jobs the window is
    /// cut into equal horizontal strips, job 0 at the top.
    pub fn calculate_screen_window(&self, job_num: u32) -> [f32; 4] {
        let frame = self.x_resolution as f32 / self.y_resolution as f32;
        let full = if frame > 1.0 {
            [-frame, frame, -1.0, 1.0]
        } else {
            [-1.0, 1.0, -1.0 / frame, 1.0 / frame]
        };

        if self.total_jobs <= 1 {
            return full;
        }

        let job = job_num.min(self.total_jobs - 1) as f32;
        let strip = (full[3] - full[2]) / self.total_jobs as f32;
        let y_max = full[3] - job * strip;
        [full[0], full[1], y_max - strip, y_max]
    }

    /// Pixel rows rendered by one job, matching `calculate_screen_window`.
    pub fn job_pixel_bounds(&self, job_num: u32) -> PixelBounds {
        split_rows(self.pixel_bounds, self.total_jobs, job_num)
    }

    /// Part of the sample extent a job has to sample.
    pub fn job_sample_bounds(&self, job_num: u32) -> PixelBounds {
        split_rows(self.get_sample_extent(), self.total_jobs, job_num)
    }

    pub fn total_jobs(&self) -> u32 {
        self.total_jobs
    }

    /// Rasterize a line overlay directly into the pixels.
    ///
    /// Each covered pixel receives `l` with weight 1. Returns false if the
    /// line misses the pixel extent entirely.
    pub fn draw_line(&self, x1: f32, y1: f32, x2: f32, y2: f32, l: Color) -> bool {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return false;
        }

        let b = self.pixel_bounds;
        let window = [
            b.x0 as f32 - 0.5,
            b.x1 as f32 - 0.5,
            b.y0 as f32 - 0.5,
            b.y1 as f32 - 0.5,
        ];
        let Some((ax, ay, bx, by)) = clip_segment(x1, y1, x2, y2, window) else {
            return false;
        };

        // Bresenham between the clipped endpoints
        let (mut x, mut y) = (ax.round() as i32, ay.round() as i32);
        let (ex, ey) = (bx.round() as i32, by.round() as i32);
        let dx = (ex - x).abs();
        let dy = -(ey - y).abs();
        let sx = if x < ex { 1 } else { -1 };
        let sy = if y < ey { 1 } else { -1 };
        let mut err = dx + dy;
        let mut drawn = false;

        loop {
            if b.contains(x, y) {
                let mut row = self.rows[(y - b.y0) as usize].lock();
                let pixel = &mut row.pixels[(x - b.x0) as usize];
                pixel.l += l;
                pixel.weight_sum += 1.0;
                drawn = true;
            }
            if x == ex && y == ey {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }

        drawn
    }

    fn output_size(&self) -> (u32, u32) {
        (
            self.pixel_bounds.width() as u32,
            self.pixel_bounds.height() as u32,
        )
    }

    fn output_path(&self, suffix: &str, extension: &str) -> PathBuf {
        PathBuf::from(format!("{}{}.{}", self.filename.display(), suffix, extension))
    }
}

/// First pixel and pixel count of one cropped axis.
fn crop_axis(resolution: u32, lo: f64, hi: f64) -> (i32, i32) {
    let res = resolution as f64;
    let (lo, hi) = (lo.clamp(0.0, 1.0), hi.clamp(0.0, 1.0));
    let start = ((res * lo).ceil() as i32).clamp(0, resolution as i32 - 1);
    let count = ((res * hi).ceil() as i32 - start).max(1);
    (start, count.min(resolution as i32 - start))
}

fn build_filter_table(filter: &dyn Filter) -> Vec<f32> {
    let extent = *filter.extent();
    let size = FILTER_TABLE_SIZE as f32;
    let mut table = Vec::with_capacity(FILTER_TABLE_SIZE * FILTER_TABLE_SIZE);
    for y in 0..FILTER_TABLE_SIZE {
        let fy = (y as f32 + 0.5) * extent.y_width / size;
        for x in 0..FILTER_TABLE_SIZE {
            let fx = (x as f32 + 0.5) * extent.x_width / size;
            table.push(filter.evaluate(fx, fy));
        }
    }
    table
}

/// Filter table cell for an offset along one axis.
#[inline]
fn table_index(offset: f32, inv_width: f32) -> usize {
    let f = (offset.abs() * inv_width * FILTER_TABLE_SIZE as f32).floor();
    (f as usize).min(FILTER_TABLE_SIZE - 1)
}

/// Liang-Barsky clip of a segment against `[x_min, x_max, y_min, y_max]`.
fn clip_segment(
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    window: [f32; 4],
) -> Option<(f32, f32, f32, f32)> {
    let [x_min, x_max, y_min, y_max] = window;
    let dx = x2 - x1;
    let dy = y2 - y1;
    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;

    for (p, q) in [
        (-dx, x1 - x_min),
        (dx, x_max - x1),
        (-dy, y1 - y_min),
        (dy, y_max - y1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((x1 + t0 * dx, y1 + t0 * dy, x1 + t1 * dx, y1 + t1 * dy))
}

fn ensure_parent(path: &Path) -> FilmResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|source| FilmError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to gamma-corrected 8-bit RGB.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    let to_byte = |v: f32| (255.0 * linear_to_gamma(v).clamp(0.0, 1.0)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z)]
}
