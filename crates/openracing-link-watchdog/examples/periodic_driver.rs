//! Periodic Driver Demo
//!
//! Runs the process-wide registry from a dedicated tick thread, the way a
//! firmware safety task would. One link is fed from a "receive" thread and
//! stays connected; the other link goes silent and trips its disconnect
//! callback once.
//!
//! Run with `RUST_LOG=openracing_link_watchdog=debug` to see registry events.

use openracing_link_watchdog::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openracing_link_watchdog=debug,info".into()),
        )
        .init();

    let registry = openracing_link_watchdog::global();
    registry.init(5)?;

    let drive_enabled = Arc::new(AtomicBool::new(true));
    let disable = Arc::clone(&drive_enabled);
    let enable = Arc::clone(&drive_enabled);
    let chassis = registry.register(
        "chassis_can",
        50,
        move || disable.store(false, Ordering::SeqCst),
        move || enable.store(true, Ordering::SeqCst),
    )?;
    registry.register(
        "remote_uplink",
        100,
        || println!("remote_uplink lost: holding last safe command"),
        || println!("remote_uplink restored"),
    )?;

    let running = Arc::new(AtomicBool::new(true));

    let ticker = {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("link-watchdog".to_string())
            .spawn(move || {
                let period = Duration::from_millis(u64::from(registry.run_cycle_ms()));
                while running.load(Ordering::SeqCst) {
                    registry.run_cycle();
                    thread::sleep(period);
                }
            })?
    };

    let receiver = {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("can-rx".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    if let Err(e) = registry.refresh_by_handle(chassis) {
                        tracing::warn!(error = %e, "Chassis feed failed");
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            })?
    };

    thread::sleep(Duration::from_millis(300));
    running.store(false, Ordering::SeqCst);
    ticker.join().map_err(|e| format!("tick thread panicked: {e:?}"))?;
    receiver.join().map_err(|e| format!("receive thread panicked: {e:?}"))?;

    for entry in registry.snapshot() {
        println!(
            "{:<14} age={:>4}ms disconnected={} episodes={} refreshes={}",
            entry.name,
            entry.age_ms,
            entry.disconnected,
            entry.disconnect_count,
            entry.refresh_count
        );
    }
    println!("drive enabled: {}", drive_enabled.load(Ordering::SeqCst));

    Ok(())
}
