//! `art` - render an ART scene configuration.
//!
//! Usage: `art [--outline] [--steps N] [config.json]`
//!
//! Without a configuration file the built-in defaults are used. The scene
//! volume is the analytic test blob from `scene.rs`.

mod scene;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use art_core::SceneConfig;
use art_math::{Color, PixelBounds};
use art_renderer::{create_filter, render_film, split_rows, Film, TransferFunction};

use scene::{OrthoCamera, VolumeMarcher};

/// Ray marching steps per ray when not given on the command line.
const DEFAULT_STEPS: usize = 64;

/// Parsed command line.
struct Args {
    config: Option<PathBuf>,
    outline: bool,
    steps: usize,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        outline: false,
        steps: DEFAULT_STEPS,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--outline" => args.outline = true,
            "--steps" => {
                let value = iter.next().context("--steps needs a value")?;
                args.steps = value
                    .parse()
                    .with_context(|| format!("Invalid step count: {}", value))?;
            }
            "-h" | "--help" => {
                println!("Usage: art [--outline] [--steps N] [config.json]");
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("Unknown option: {}", arg),
            _ => args.config = Some(PathBuf::from(arg)),
        }
    }

    Ok(args)
}

fn build_transfer_function(config: &SceneConfig) -> Result<TransferFunction> {
    let fields = config
        .fields
        .to_field_set()
        .context("Invalid field profile")?;
    let mut tf = TransferFunction::from_settings(&config.transfer, fields);

    for directive in &config.transfer.directives {
        let trimmed = directive.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Err(e) = tf.add_parse_string(trimmed) {
            log::warn!("Skipping transfer function '{}': {}", trimmed, e);
        }
    }

    if tf.is_empty() {
        log::warn!("No transfer functions defined, adding a default density ramp");
        tf.add_parse_string("linear 0 0 1 0 0 0 1 0.8 0.4")?;
    }

    log::info!(
        "Transfer function: {} components over {} fields",
        tf.len(),
        tf.fields().len()
    );
    Ok(tf)
}

/// Draw the outline of the domain's front face.
fn draw_domain_outline(film: &Film, window: [f32; 4]) {
    let xres = film.x_resolution as f32;
    let yres = film.y_resolution as f32;
    let to_raster = |x: f32, y: f32| {
        (
            (x - window[0]) / (window[1] - window[0]) * xres - 0.5,
            (window[3] - y) / (window[3] - window[2]) * yres - 0.5,
        )
    };

    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let color = Color::new(0.2, 0.2, 0.2);
    let mut drawn = 0;
    for i in 0..corners.len() {
        let (ax, ay) = to_raster(corners[i].0, corners[i].1);
        let (bx, by) = to_raster(corners[(i + 1) % 4].0, corners[(i + 1) % 4].1);
        if film.draw_line(ax, ay, bx, by, color) {
            drawn += 1;
        }
    }
    log::debug!("Outline: {} of 4 edges visible", drawn);
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            log::info!("No config given, using defaults");
            SceneConfig::default()
        }
    };

    let tf = build_transfer_function(&config)?;
    let fields = tf.fields().clone();

    let filter = create_filter(&config.filter);
    let mut film = Film::from_settings(&config.film, filter, &fields);
    log::info!(
        "Rendering {}x{} ({} job(s), {} filter)",
        film.x_resolution,
        film.y_resolution,
        film.total_jobs(),
        film.filter().name()
    );

    let full_res = PixelBounds::new(
        0,
        film.x_resolution as i32,
        0,
        film.y_resolution as i32,
    );

    for job in 0..film.total_jobs() {
        let window = film.calculate_screen_window(job);
        let rows = split_rows(full_res, film.total_jobs(), job);
        let camera = OrthoCamera::new(window, film.x_resolution, rows);
        let marcher = VolumeMarcher::new(camera, &tf, args.steps);

        let stats = render_film(&film, &marcher, &config.render, film.job_sample_bounds(job));
        log::info!(
            "Job {}: {} buckets, {} samples, {} misses",
            job,
            stats.buckets,
            stats.samples,
            stats.misses
        );

        let b = film.job_pixel_bounds(job);
        film.update_display(b.x0, b.y0, b.x1, b.y1, config.render.splat_scale);
    }

    if args.outline {
        let window = if film.total_jobs() == 1 {
            film.calculate_screen_window(0)
        } else {
            let top = film.calculate_screen_window(0);
            let bottom = film.calculate_screen_window(film.total_jobs() - 1);
            [top[0], top[1], bottom[2], top[3]]
        };
        draw_domain_outline(&film, window);
    }

    if let Some(preview) = film.preview() {
        let mean = preview.iter().copied().sum::<Color>() / preview.len().max(1) as f32;
        log::info!(
            "Preview mean color: ({:.4}, {:.4}, {:.4})",
            mean.x,
            mean.y,
            mean.z
        );
    }

    let image = film
        .write_image(0, config.render.splat_scale)
        .context("Failed to write image")?;
    let raw = film.write_raw_rgb().context("Failed to write raw RGB")?;
    let integrals = film
        .write_integrals()
        .context("Failed to write integrals")?;

    println!("{}", image.display());
    println!("{}", raw.display());
    println!("{}", integrals.display());
    Ok(())
}
