//! Binary entrypoint for the media screensaver.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use media_screensaver::catalog::Catalog;
use media_screensaver::events::{AdapterEvent, PresentationCommand};
use media_screensaver::sequencer::Sequencer;
use media_screensaver::{config, platform, render, tasks};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "media-screensaver", about = "Full-screen image and video screensaver")]
struct Cli {
    /// Path to the YAML settings file
    #[arg(value_name = "SETTINGS")]
    settings: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("media_screensaver={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let settings = config::from_yaml_file(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    settings.validate().context("validating settings")?;

    platform::power::inhibit_suspend(settings.power.inhibit_command.as_deref());

    // Discovery runs to completion before anything is shown; a failure here
    // aborts startup with no window.
    let catalog = Arc::new(Catalog::build(
        &settings.media.paths,
        settings.media.order,
        settings.media.shuffle_seed,
    )?);
    info!(count = catalog.len(), "media catalog ready");

    render::video::init()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let (event_tx, event_rx) = mpsc::channel::<AdapterEvent>(64);
    let (command_tx, mut command_rx) = mpsc::channel::<PresentationCommand>(16);
    let cancel = CancellationToken::new();

    let sequencer = Sequencer::new(catalog, settings.playback.clone());
    let driver = runtime.spawn(tasks::driver::run(
        sequencer,
        event_rx,
        command_tx,
        cancel.clone(),
    ));

    let event_loop = winit::event_loop::EventLoop::<PresentationCommand>::with_user_event()
        .build()
        .context("creating event loop")?;
    let proxy = event_loop.create_proxy();
    runtime.spawn(async move {
        while let Some(command) = command_rx.recv().await {
            if proxy.send_event(command).is_err() {
                break;
            }
        }
    });

    let mut app = render::window::SaverApp::new(event_tx);
    event_loop.run_app(&mut app).context("running event loop")?;

    cancel.cancel();
    let _ = runtime.block_on(async { tokio::time::timeout(Duration::from_secs(2), driver).await });
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
