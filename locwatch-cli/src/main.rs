//! Locwatch demo binary.
//!
//! Runs the full acquisition flow against a simulated device: permission
//! request, optional settings resolution, then streamed fixes. Useful for
//! watching the status transitions without a real location stack.

mod sim;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::info;

use locwatch::{
    AccuracyTier, Configuration, HostActions, LocationStatus, LocwatchError, Platform,
};

use crate::sim::{SimHost, SimPermissions, SimProvider};

/// Watch simulated location fixes flow through locwatch.
#[derive(Debug, Parser)]
#[command(name = "locwatch", version, about)]
struct Args {
    /// Interval between fixes, in milliseconds.
    #[arg(long, default_value_t = 2_000)]
    interval_ms: u64,

    /// Requested accuracy tier.
    #[arg(long, value_enum, default_value_t = AccuracyArg::Balanced)]
    accuracy: AccuracyArg,

    /// Simulate a user who denies the permission request.
    #[arg(long)]
    deny_permission: bool,

    /// Start with device location settings disabled, forcing the
    /// resolution flow.
    #[arg(long)]
    location_disabled: bool,

    /// Exit after this many fixes (0 runs until Ctrl-C).
    #[arg(long, default_value_t = 5)]
    fixes: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AccuracyArg {
    /// Most precise fixes, highest power draw.
    High,
    /// Balance between precision and power.
    Balanced,
    /// Coarse fixes, low power draw.
    Low,
    /// Passive fixes only.
    NoPower,
}

impl From<AccuracyArg> for AccuracyTier {
    fn from(arg: AccuracyArg) -> Self {
        match arg {
            AccuracyArg::High => AccuracyTier::HighAccuracy,
            AccuracyArg::Balanced => AccuracyTier::BalancedPower,
            AccuracyArg::Low => AccuracyTier::LowPower,
            AccuracyArg::NoPower => AccuracyTier::NoPower,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), LocwatchError> {
    let args = Args::parse();
    locwatch::logging::init("info");

    let settings_enabled = Arc::new(AtomicBool::new(!args.location_disabled));
    let config = Configuration::builder()
        .update_interval_ms(args.interval_ms)
        .accuracy(args.accuracy.into())
        .build()?;

    locwatch::configure(
        config,
        Platform {
            permissions: Arc::new(SimPermissions::new(args.deny_permission)),
            provider: Arc::new(SimProvider::new(settings_enabled.clone())),
        },
    )?;
    let instance = locwatch::instance()?;

    // The host must outlive the binding; only a weak reference is kept.
    let host: Arc<dyn HostActions> = Arc::new(SimHost::new(settings_enabled));
    instance.bind_host(&host);

    let mut permissions = instance.permission_updates();
    tokio::spawn(async move {
        while let Some(status) = permissions.recv().await {
            info!(?status, "permission status");
        }
    });

    let mut updates = instance.location_updates();
    let mut seen = 0u32;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            status = updates.recv() => match status {
                Some(LocationStatus::HasLocation(fix)) => {
                    info!(%fix, "location fix");
                    seen += 1;
                    if args.fixes != 0 && seen >= args.fixes {
                        info!(fixes = seen, "done");
                        break;
                    }
                }
                Some(status) => info!(?status, "location status"),
                None => break,
            }
        }
    }

    drop(updates);
    drop(instance);
    locwatch::reset();
    Ok(())
}
