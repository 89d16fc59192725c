use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context as _};
use image::{imageops, RgbImage};

use match_scenes::assets::MaskAssets;
use match_scenes::config::Config;
use match_scenes::detection::{build_default_detectors, Readers};
use match_scenes::error::AppResult;
use match_scenes::matcher::{REFERENCE_1080P, REFERENCE_720P};
use match_scenes::messaging::LogListener;
use match_scenes::ocr::{GlyphClassifier, TextReader};
use match_scenes::utils::{IterationTiming, LatencyStats};
use match_scenes::{Engine, Frame};

const USAGE: &str = "usage: match-scenes <frames-dir> [--bench]";

/// Initialize tracing with file rotation
///
/// Logs go to the console and to `<config dir>/match-scenes/logs/`, one
/// file per day (`match-scenes.YYYY-MM-DD.log`).
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("match-scenes").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "match-scenes.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Log directory: {}", log_dir.display());
}

struct Args {
    frames_dir: PathBuf,
    bench: bool,
}

fn parse_args() -> AppResult<Args> {
    let mut frames_dir = None;
    let mut bench = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--bench" => bench = true,
            flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
            path if frames_dir.is_none() => frames_dir = Some(PathBuf::from(path)),
            _ => bail!(USAGE),
        }
    }
    let frames_dir = frames_dir.context(USAGE)?;
    Ok(Args { frames_dir, bench })
}

/// PNG and JPEG files of `dir`, sorted by name
fn frame_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read frames directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Standard frame plus the high-resolution one when the input is 1080p
fn decode_frame(path: &Path) -> AppResult<(Frame, Option<Frame>)> {
    let image: RgbImage = image::open(path)
        .with_context(|| format!("Failed to decode frame {}", path.display()))?
        .to_rgb8();

    if image.dimensions() == REFERENCE_1080P {
        let standard = imageops::resize(
            &image,
            REFERENCE_720P.0,
            REFERENCE_720P.1,
            imageops::FilterType::Triangle,
        );
        Ok((Arc::new(standard), Some(Arc::new(image))))
    } else {
        Ok((Arc::new(image), None))
    }
}

fn load_reader(what: &str, model_path: &Path) -> AppResult<Box<dyn TextReader>> {
    let classifier = GlyphClassifier::load(model_path)
        .with_context(|| format!("Failed to load {} model {}", what, model_path.display()))?;
    tracing::info!("Loaded {} model ({} samples)", what, classifier.samples().len());
    Ok(Box::new(classifier))
}

fn build_engine(config: &Config, config_dir: &Path) -> AppResult<Engine> {
    let mask_root = config.mask_root_in(config_dir);
    tracing::info!("Mask root: {}", mask_root.display());
    let assets = MaskAssets::new(mask_root, config.languages.clone(), config.default_language.clone());

    let mut readers = Readers::default();
    if config.detectors.timer {
        readers.timer = Some(load_reader("timer", &config.timer_model_in(config_dir))?);
    }
    if config.detectors.paint_tracker {
        readers.paint = Some(load_reader("paint counter", &config.paint_model_in(config_dir))?);
    }

    let detectors = build_default_detectors(&config.detectors, &assets, readers)?;
    let mut engine = Engine::new(config.frame_interval_ms).with_preview(config.preview);
    engine
        .register_all(detectors)
        .context("Failed to register detectors")?;
    engine.add_listener(Box::new(LogListener));
    Ok(engine)
}

fn main() -> AppResult<()> {
    initialize_tracing();

    let args = parse_args()?;
    let config_path = Config::config_path()?;
    let config = Config::load_from(&config_path).context("Failed to load configuration")?;
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut engine = build_engine(&config, &config_dir)?;

    let mut files = frame_files(&args.frames_dir)?;
    if files.is_empty() {
        bail!("No PNG or JPEG frames in {}", args.frames_dir.display());
    }
    if args.bench {
        files.truncate(config.bench_frames);
    }
    tracing::info!("Replaying {} frames from {}", files.len(), args.frames_dir.display());

    let mut stats = LatencyStats::with_capacity(files.len());
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for path in &files {
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let (frame, frame_hd) = match decode_frame(path) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!("Skipping frame: {:#}", e);
                continue;
            }
        };
        let decode_us = decode_start.elapsed().as_secs_f64() * 1_000_000.0;

        for event in engine.tick(frame, frame_hd) {
            *counts.entry(event.name()).or_default() += 1;
        }

        let (detect_us, dispatch_us) = engine.last_timing();
        stats.add(IterationTiming {
            decode_us,
            detect_us,
            dispatch_us,
            total_us: total_start.elapsed().as_secs_f64() * 1_000_000.0,
        });
    }

    tracing::info!("Replay finished after {} ticks", engine.context().tick());
    for (name, count) in &counts {
        tracing::info!("  {:<28} {}", name, count);
    }

    if args.bench {
        stats.print_report(config.frame_interval_ms);
    }
    Ok(())
}
