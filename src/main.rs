mod config;
mod control;
mod cpu_stress;
mod display;
mod heater;
mod input;
mod keyboard;
mod terminal;
mod usage;

use std::fs::File;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::config::{Args, Config};
use crate::heater::Heater;
use crate::keyboard::PlatformKeyboard;
use crate::terminal::CrosstermSurface;

fn init_logging(args: &Args) -> Result<()> {
    let lcfg = ConfigBuilder::new()
        .set_time_level(LevelFilter::Error)
        .set_location_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Debug)
        .build();

    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            WriteLogger::init(args.log_level, lcfg, file)?;
        }
        None => {
            TermLogger::init(args.log_level, lcfg, TerminalMode::Stderr, ColorChoice::Auto)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let config = Config::from(&args);

    let detected = cpu_stress::detect_core_count();
    let cores = cpu_stress::resolve_core_count(config.threads.unwrap_or(detected));
    info!("detected {detected} CPU cores, starting {cores} load workers");

    let keyboard = PlatformKeyboard::open().context("failed to open the keyboard")?;
    let heater = Heater::new(CrosstermSurface::stdout(), keyboard, cores, config.timings)
        .with_usage(config.show_usage);

    let state = heater.state();
    ctrlc::set_handler(move || state.stop()).context("Error setting Ctrl-C handler")?;

    heater.run()
}
