use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rivvon",
    author,
    version,
    about = "Slit-scan camera textures on an animated ribbon",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `rivvon.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "RIVVON_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON stroke (`[[x, y], ...]` in screen pixels) to build the ribbon from.
    #[arg(long, value_name = "FILE")]
    pub stroke: Option<PathBuf>,

    /// Feed the slit-scanner from a directory of images instead of the
    /// synthetic camera.
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Number of render ticks before exiting.
    #[arg(long, value_name = "N", value_parser = parse_ticks)]
    pub ticks: Option<u64>,

    /// Animation rate of the fixed-step clock.
    #[arg(long, value_name = "FPS", value_parser = parse_positive_f32)]
    pub fps: Option<f32>,

    /// Ribbon width in world units.
    #[arg(long, value_name = "W", value_parser = parse_positive_f32)]
    pub width: Option<f32>,

    /// Write the slit-scan texture to this PNG path when done.
    #[arg(long, value_name = "PATH", value_parser = parse_png_path)]
    pub capture: Option<PathBuf>,

    /// Upload the captured PNG to the configured storage folder.
    #[arg(long)]
    pub upload: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect configuration files and directories.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration directory and file.
    Where,
    /// Parse and validate a configuration file.
    Check {
        /// File to check; defaults to the resolved configuration file.
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_ticks(value: &str) -> Result<u64, String> {
    let ticks: u64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid tick count '{value}'"))?;
    if ticks == 0 {
        return Err("tick count must be at least 1".into());
    }
    Ok(ticks)
}

pub fn parse_positive_f32(value: &str) -> Result<f32, String> {
    let parsed: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{value}'"))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(format!("value must be greater than zero, got {value}"));
    }
    Ok(parsed)
}

pub fn parse_png_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match extension(&path).as_deref() {
        Some("png") => Ok(path),
        None => Err("capture path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported capture format '.{other}'; expected .png"
        )),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
