mod cli;
mod paths;
mod run;
mod settings;
mod stroke;

use std::path::PathBuf;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    let paths = AppPaths::discover()?;

    match action {
        ConfigAction::Where => run_config_where(&paths),
        ConfigAction::Check { file } => run_config_check(&paths, file),
    }
}

fn run_config_where(paths: &AppPaths) -> Result<()> {
    let file = paths.config_file();
    println!("Configuration:");
    println!("  dir:   {}", paths.config_dir().display());
    println!(
        "  file:  {} ({})",
        file.display(),
        if file.is_file() { "present" } else { "missing" }
    );
    Ok(())
}

fn run_config_check(paths: &AppPaths, file: Option<PathBuf>) -> Result<()> {
    let file = file.unwrap_or_else(|| paths.config_file());
    let config = settings::read_config(&file)?;
    println!("{} is valid", file.display());
    println!(
        "  ribbon:   width={} drawing_width={} samples={}",
        config.ribbon.width, config.ribbon.drawing_width, config.ribbon.drawing_samples
    );
    let resolutions: Vec<String> = config
        .slitscan
        .resolutions
        .iter()
        .map(ToString::to_string)
        .collect();
    println!(
        "  slitscan: height={} resolutions=[{}] facing={:?}",
        config.slitscan.height,
        resolutions.join(", "),
        config.slitscan.facing
    );
    println!(
        "  render:   fps={} ticks={}",
        config.render.fps,
        config
            .tick_budget()
            .map_or_else(|| format!("{} (default)", run::DEFAULT_TICKS), |t| t.to_string())
    );
    println!("  upload:   folder={}", config.upload.folder);
    Ok(())
}
