//! E-paper panel driver for Raspberry Pi.
//!
//! One-shot commands: show an image, clear the panel, or put it to sleep.
//! `--dry-run` swaps the GPIO/SPI transport for an in-memory recorder and
//! writes the exact byte stream the panel would have received to a file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use epaper_stream::config::{Config, DEFAULT_CONFIG_PATH};
use epaper_stream::display::{
    DeviceProfile, DisplayEngine, HardwareTransport, Model, RaspberryPiTransport, RecordingTransport,
};
use epaper_stream::image_proc::load_image;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "epaper-stream")]
#[command(about = "Drive SPI e-paper panels from a Raspberry Pi")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Panel model (overrides config)
    #[arg(short, long, global = true, value_enum)]
    model: Option<Model>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Record the wire bytes to FILE instead of touching hardware
    #[arg(long, global = true, value_name = "FILE")]
    dry_run: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Display an image file
    Show {
        image: PathBuf,

        /// Dither onto the panel palette
        #[arg(long, overrides_with = "no_dither")]
        dither: bool,

        /// Map each pixel to its nearest palette color
        #[arg(long)]
        no_dither: bool,
    },

    /// Clear the panel to white
    Clear {
        /// Clear to black instead
        #[arg(long)]
        black: bool,
    },

    /// Put the panel into deep sleep
    Sleep,

    /// Write a default configuration file
    InitConfig { path: PathBuf },

    /// List supported panel models
    Models,
}

/// Panel work that needs a transport
#[derive(Debug)]
enum Action {
    /// `None` takes the dither setting from the config
    Show { image: PathBuf, dither: Option<bool> },
    Clear { black: bool },
    Sleep,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let action = match args.command {
        Command::InitConfig { path } => {
            Config::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
            return Ok(());
        }
        Command::Models => {
            print_models()?;
            return Ok(());
        }
        Command::Show {
            image,
            dither,
            no_dither,
        } => Action::Show {
            image,
            dither: match (dither, no_dither) {
                (_, true) => Some(false),
                (true, false) => Some(true),
                (false, false) => None,
            },
        },
        Command::Clear { black } => Action::Clear { black },
        Command::Sleep => Action::Sleep,
    };

    let mut config = Config::load_or_default(&args.config);
    if let Some(model) = args.model {
        config.model = model;
    }
    let profile = config.model.profile()?;
    tracing::info!("Using {} panel", profile.name());

    match &args.dry_run {
        Some(out) => {
            let recorder = RecordingTransport::new();
            execute(profile, recorder.clone(), &config, &action)?;
            write_capture(out, &recorder.wire_bytes())?;
        }
        None => {
            let transport = RaspberryPiTransport::open(&config.transport)
                .context("Failed to open GPIO/SPI transport")?;
            execute(profile, transport, &config, &action)?;
        }
    }

    Ok(())
}

/// Initialize the panel, run `action` and release the hardware.
fn execute<T: HardwareTransport>(
    profile: DeviceProfile,
    transport: T,
    config: &Config,
    action: &Action,
) -> anyhow::Result<()> {
    let mut engine = DisplayEngine::new(profile);
    engine.set_busy_timeout(config.busy_timeout());
    engine.initialize(transport)?;

    match action {
        Action::Show { image, dither } => {
            let profile = engine.profile();
            let options = config.transform_options(profile.width(), profile.height());
            let img = load_image(image, &options)
                .with_context(|| format!("Failed to load {}", image.display()))?;
            engine.display_image(&img.view(), dither.unwrap_or(config.dither))?;
            engine.sleep()?;
        }
        Action::Clear { black } => {
            if *black {
                engine.clear_black()?;
            } else {
                engine.clear()?;
            }
            engine.sleep()?;
        }
        Action::Sleep => engine.sleep()?,
    }

    engine.dispose();
    Ok(())
}

fn write_capture(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Recorded {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn print_models() -> anyhow::Result<()> {
    for model in Model::all() {
        let profile = model.profile()?;
        println!(
            "{:<12} {:>4}x{:<4} {} colors, {} px/byte, {:?}",
            profile.name(),
            profile.width(),
            profile.height(),
            profile.palette().len(),
            profile.pixels_per_byte(),
            profile.family()
        );
    }
    Ok(())
}

/// Initialize tracing/logging
///
/// Default level is "warn" to minimize SD card wear from log writes.
/// Use --verbose flag for "debug" level during development/troubleshooting.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("epaper_stream={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
