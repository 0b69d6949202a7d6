//! driveback - incremental, content-addressed backups to an external drive.
//!
//! Usage:
//!   driveback                     Back up your home directory to
//!                                 /media/<user>/New Volume
//!   driveback -d "Backup Disk"    Use a different drive label
//!   driveback --no-zip            Leave new files in staging/ unzipped
//!   driveback --help              Show help

mod console;
mod settings;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{eyre, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use driveback_core::{BackupConfig, BackupLayout};
use driveback_ops::BackupEngine;

use crate::console::{print_summary, ConsoleProgress};
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(
    name = "driveback",
    version,
    about = "Incremental backups of media and documents to an external drive",
    long_about = "driveback copies every file under your home directory whose content \
                  is not yet on the backup drive, then bundles this run's new files \
                  into a dated zip archive.\n\n\
                  Files are compared by content, so renamed or duplicated files are \
                  stored once."
)]
struct Cli {
    /// Label of the backup drive, mounted at <media_root>/<user>/<label>
    #[arg(short, long)]
    drive: Option<String>,

    /// Leave new files in staging/ instead of zipping them
    #[arg(long)]
    no_zip: bool,

    /// Directory to back up (defaults to your home directory)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Settings file (defaults to <config dir>/driveback/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let config = build_config(&cli, &settings)?;
    info!(
        source = %config.source_root.display(),
        backup_root = %config.backup_root.display(),
        zip = config.zip,
        "starting backup"
    );

    let engine = BackupEngine::new(config);
    let report = engine
        .run(&mut ConsoleProgress)
        .wrap_err("Backup failed")?;
    print_summary(&report);

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Resolve ambient locations and merge CLI flags over settings.
fn build_config(cli: &Cli, settings: &Settings) -> Result<BackupConfig> {
    let source = match &cli.source {
        Some(path) => path.clone(),
        None => dirs::home_dir().ok_or_else(|| eyre!("Could not determine home directory"))?,
    };

    let user = current_user()?;
    let label = cli.drive.as_deref().unwrap_or_else(|| settings.drive());
    let layout = BackupLayout::for_drive(&settings.media_root(), &user, label);

    let mut builder = BackupConfig::builder();
    builder
        .source_root(source)
        .backup_root(layout.root())
        .policy(settings.policy())
        .zip(!cli.no_zip && settings.zip.unwrap_or(true));
    if let Some(level) = settings.compression_level {
        builder.compression_level(level);
    }
    if let Some(threads) = settings.hash_threads {
        builder.hash_threads(threads);
    }

    builder.build().wrap_err("Invalid configuration")
}

#[cfg(unix)]
fn current_user() -> Result<String> {
    use nix::unistd::{Uid, User};

    match User::from_uid(Uid::current()) {
        Ok(Some(user)) => Ok(user.name),
        _ => user_from_env(),
    }
}

#[cfg(not(unix))]
fn current_user() -> Result<String> {
    user_from_env()
}

fn user_from_env() -> Result<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .map_err(|_| eyre!("Could not determine the current user"))
}
