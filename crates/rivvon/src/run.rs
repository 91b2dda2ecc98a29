use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ribbon::{
    default_w, FixedStepTimeSource, MeshLedger, Ribbon, TimeSource, Vec2, WaveParams,
};
use rivconfig::{Facing, RivvonConfig};
use slitscan::{
    FacingMode, ImageSequenceCamera, Resolution, ScanOptions, SlitScanner, SyntheticCamera,
    TextureHandle, PREFERRED_RESOLUTIONS,
};
use tracing_subscriber::EnvFilter;
use uploader::{timestamped_file_name, UploadClient, UploadConfig};

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::settings;
use crate::stroke::load_stroke;

/// Ticks rendered when neither `--ticks` nor `render.duration` is set.
pub const DEFAULT_TICKS: u64 = 120;

const SYNTHETIC_RESOLUTION: Resolution = Resolution::new(640, 480);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = settings::load(args.config.as_deref(), &paths)?;
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        source = ?loaded.source,
        "resolved rivvon configuration"
    );

    let plan = RunPlan::resolve(&args, &loaded.config)?;
    let report = execute(&plan, &loaded.config)?;
    tracing::info!(
        ticks = report.ticks,
        frames = report.frames_scanned,
        meshes = report.meshes_built,
        uploads = report.texture_uploads,
        resolution = %report.resolution,
        "ribbon session finished"
    );

    let Some(png) = report.png else {
        return Ok(());
    };
    if let Some(path) = &plan.capture {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, &png)
            .with_context(|| format!("failed to write capture to {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = png.len(), "wrote slit-scan capture");
    }
    if plan.upload {
        upload(&loaded.config, png)?;
    }
    Ok(())
}

/// Everything one headless session needs, after CLI flags override the file.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub ticks: u64,
    pub fps: f32,
    pub width: f32,
    pub stroke: Option<Vec<Vec2>>,
    pub frames: Option<PathBuf>,
    pub capture: Option<PathBuf>,
    pub upload: bool,
}

impl RunPlan {
    pub fn resolve(args: &RunArgs, config: &RivvonConfig) -> Result<Self> {
        let stroke = args.stroke.as_deref().map(load_stroke).transpose()?;
        let default_width = if stroke.is_some() {
            config.ribbon.drawing_width
        } else {
            config.ribbon.width
        };
        let fps = args.fps.unwrap_or(config.render.fps);
        let ticks = args
            .ticks
            .or_else(|| config.tick_budget())
            .unwrap_or(DEFAULT_TICKS)
            .max(1);

        Ok(Self {
            ticks,
            fps,
            width: args.width.unwrap_or(default_width),
            stroke,
            frames: args.frames.clone(),
            capture: args.capture.clone(),
            upload: args.upload,
        })
    }

    fn wants_png(&self) -> bool {
        self.capture.is_some() || self.upload
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub ticks: u64,
    pub frames_scanned: u64,
    pub meshes_built: u64,
    pub texture_uploads: u64,
    pub resolution: Resolution,
    pub png: Option<Vec<u8>>,
}

/// Drives the slit-scanner and ribbon for `plan.ticks` fixed-step ticks.
pub fn execute(plan: &RunPlan, config: &RivvonConfig) -> Result<RunReport> {
    let mut scanner = SlitScanner::new(scan_options(config));
    let texture = match &plan.frames {
        Some(dir) => {
            let mut camera = ImageSequenceCamera::from_dir(dir)
                .with_context(|| format!("failed to read frames from {}", dir.display()))?;
            scanner.initialize(&mut camera)
        }
        None => {
            let mut camera = SyntheticCamera::new(SYNTHETIC_RESOLUTION)
                .with_supported(PREFERRED_RESOLUTIONS)
                .with_frame_limit(plan.ticks);
            scanner.initialize(&mut camera)
        }
    }
    .context("failed to start slit-scan capture")?;

    let mut ribbon = Ribbon::new(MeshLedger::<TextureHandle>::new(), wave_params(config));
    ribbon.set_texture(Some(texture.clone()));
    let built = match &plan.stroke {
        Some(points) => {
            ribbon.create_from_drawing_with(points, config.ribbon.drawing_samples, plan.width)
        }
        None => ribbon.build_from_points(&default_w(), plan.width, 0.0),
    };
    if built.is_none() {
        bail!("ribbon backbone needs at least two points");
    }

    let mut clock = FixedStepTimeSource::new(plan.fps);
    let mut texture_uploads = 0;
    for _ in 0..plan.ticks {
        let sample = clock.sample();
        if texture.take_dirty() {
            texture_uploads += 1;
        }
        ribbon.update(sample.seconds);
        tracing::trace!(
            frame = sample.frame_index,
            time = sample.seconds,
            scanned = scanner.frames_processed(),
            "render tick"
        );
    }

    // Finite sources are drained completely so captures are reproducible.
    scanner.join();
    let resolution = scanner.resolution().unwrap_or(SYNTHETIC_RESOLUTION);
    let png = if plan.wants_png() {
        Some(
            texture
                .with_buffer(|buffer| buffer.encode_png())
                .context("failed to encode slit-scan texture")?,
        )
    } else {
        None
    };

    let meshes_built = ribbon.surface().attached_total();
    ribbon.dispose();
    Ok(RunReport {
        ticks: plan.ticks,
        frames_scanned: scanner.frames_processed(),
        meshes_built,
        texture_uploads,
        resolution,
        png,
    })
}

fn scan_options(config: &RivvonConfig) -> ScanOptions {
    ScanOptions {
        height: config.slitscan.height,
        resolutions: config
            .slitscan
            .resolutions
            .iter()
            .map(|size| Resolution::new(size.width, size.height))
            .collect(),
        facing: match config.slitscan.facing {
            Facing::Environment => FacingMode::Environment,
            Facing::User => FacingMode::User,
        },
    }
}

fn wave_params(config: &RivvonConfig) -> WaveParams {
    let wave = config.ribbon.wave;
    WaveParams {
        amplitude: wave.amplitude,
        frequency: wave.frequency,
        speed: wave.speed,
    }
}

fn upload_config(config: &RivvonConfig) -> Result<UploadConfig> {
    let upload = &config.upload;
    UploadConfig::new(&upload.link_endpoint, &upload.upload_endpoint, &upload.folder)
        .context("invalid upload configuration")
}

fn upload(config: &RivvonConfig, png: Vec<u8>) -> Result<()> {
    let client = UploadClient::new(upload_config(config)?)?;
    let file_name = timestamped_file_name();
    let receipt = client
        .upload_png(&file_name, png)
        .context("screenshot upload failed")?;
    println!("Uploaded {} ({} bytes)", receipt.file_name, receipt.bytes);
    Ok(())
}
