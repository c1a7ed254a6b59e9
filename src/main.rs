use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use xautocfg::{ConfigSource, ParseOptions};

#[derive(Parser)]
#[command(name = "xautocfg")]
#[command(about = "Set the keyboard repeat rate whenever a new X11 keyboard appears")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/xautocfg.cfg)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn config_source(cli: &Cli) -> Result<ConfigSource> {
    match &cli.config {
        Some(path) => Ok(ConfigSource::Explicit(path.clone())),
        None => xautocfg::default_path()
            .map(ConfigSource::Implicit)
            .context("home directory not set, can't locate config"),
    }
}

fn load_config(cli: &Cli) -> Result<xautocfg::Config> {
    let source = config_source(cli)?;
    let config = xautocfg::load(&source, &ParseOptions::with_home_expansion())?.into_config();
    log::info!(
        "Keyboard config: delay={}, interval={}",
        config.keyboard.delay,
        config.keyboard.interval
    );
    Ok(config)
}

#[cfg(unix)]
fn run(cli: Cli) -> Result<()> {
    use xautocfg::{Dispatcher, ShellRunner, XDisplay};

    let config = load_config(&cli)?;

    let display = XDisplay::open()?;
    display.select_hierarchy_events();

    let mut dispatcher = Dispatcher::new(&config, &display, ShellRunner::new());
    dispatcher.apply_core_keyboard();
    dispatcher.run(&display)
}

#[cfg(not(unix))]
fn run(cli: Cli) -> Result<()> {
    load_config(&cli)?;
    anyhow::bail!("X11 keyboard configuration is not supported on this platform")
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
