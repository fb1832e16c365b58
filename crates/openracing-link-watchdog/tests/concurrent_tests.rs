//! Concurrency tests for the watchdog registry.

use openracing_link_watchdog::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn counting(count: &Arc<AtomicU32>) -> impl Fn() + Send + Sync + 'static {
    let count = Arc::clone(count);
    move || {
        count.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_concurrent_registration() {
    let registry = Arc::new(WatchdogRegistry::new());
    let mut handles = vec![];

    for i in 0..10 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            registry
                .register(&format!("link_{i}"), 100, || {}, || {})
                .is_ok()
        }));
    }

    for handle in handles {
        assert!(
            matches!(handle.join(), Ok(true)),
            "Registration thread should succeed"
        );
    }

    assert_eq!(registry.len(), 10);
}

#[test]
fn test_concurrent_refresh_invokes_every_callback() -> TestResult {
    let registry = Arc::new(WatchdogRegistry::new());
    let refreshes = Arc::new(AtomicU32::new(0));
    registry.register("shared", 1_000, || {}, counting(&refreshes))?;

    let mut handles = vec![];
    for _ in 0..4 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            (0..100)
                .filter(|_| registry.refresh_by_name("shared").is_ok())
                .count()
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        succeeded += handle.join().map_err(|e| format!("refresh thread panicked: {e:?}"))?;
    }

    assert_eq!(succeeded, 400);
    assert_eq!(refreshes.load(Ordering::SeqCst), 400);
    let snapshot = registry.entry_by_name("shared").ok_or("Expected entry")?;
    assert_eq!(snapshot.refresh_count, 400);
    Ok(())
}

#[test]
fn test_tick_concurrent_with_churn_fires_once() -> TestResult {
    let registry = Arc::new(WatchdogRegistry::new());
    let cold_disconnects = Arc::new(AtomicU32::new(0));
    registry.register("cold", 50, counting(&cold_disconnects), || {})?;
    registry.register("hot", u32::MAX, || {}, || {})?;

    let ticker = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..500 {
                registry.tick(1);
            }
        })
    };

    let mut churners = vec![];
    for worker in 0..3 {
        let registry = Arc::clone(&registry);
        churners.push(thread::spawn(move || {
            for round in 0..100 {
                let name = format!("temp_{worker}_{round}");
                if let Ok(handle) = registry.register(&name, 10, || {}, || {}) {
                    let _refreshed = registry.refresh_by_name("hot").is_ok();
                    let _removed = registry.remove_by_handle(handle).is_ok();
                }
            }
        }));
    }

    ticker.join().map_err(|e| format!("ticker panicked: {e:?}"))?;
    for churner in churners {
        churner.join().map_err(|e| format!("churn thread panicked: {e:?}"))?;
    }

    assert_eq!(cold_disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 2);
    let cold = registry.entry_by_name("cold").ok_or("Expected cold entry")?;
    assert_eq!(cold.age_ms, 500);
    assert!(cold.disconnected);
    let hot = registry.entry_by_name("hot").ok_or("Expected hot entry")?;
    assert!(!hot.disconnected);
    Ok(())
}

#[test]
fn test_concurrent_remove_by_name_succeeds_once() -> TestResult {
    let registry = Arc::new(WatchdogRegistry::new());
    registry.register("target", 100, || {}, || {})?;
    registry.register("bystander", 100, || {}, || {})?;

    let removed = Arc::new(AtomicU32::new(0));
    let mut handles = vec![];
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        let removed = Arc::clone(&removed);
        handles.push(thread::spawn(move || {
            if registry.remove_by_name("target").is_ok() {
                removed.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    for handle in handles {
        handle.join().map_err(|e| format!("remove thread panicked: {e:?}"))?;
    }

    assert_eq!(removed.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.handle_of("bystander").is_some());
    Ok(())
}

#[test]
fn test_after_unlock_dispatch_under_contention() -> TestResult {
    let config = RegistryConfig::builder()
        .dispatch(CallbackDispatch::AfterUnlock)
        .build()?;
    let registry = Arc::new(WatchdogRegistry::with_config(config)?);
    let disconnects = Arc::new(AtomicU32::new(0));

    // Each disconnect immediately feeds the entry back from inside the callback.
    let inner = Arc::clone(&registry);
    let count = Arc::clone(&disconnects);
    registry.register(
        "self_healing",
        5,
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            let _fed = inner.refresh_by_name("self_healing").is_ok();
        },
        || {},
    )?;

    let mut handles = vec![];
    for _ in 0..2 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                registry.tick(5);
            }
        }));
    }
    for handle in handles {
        handle.join().map_err(|e| format!("tick thread panicked: {e:?}"))?;
    }

    // Every tick of 5ms breaches a freshly fed entry at most once.
    let fired = disconnects.load(Ordering::SeqCst);
    assert!((1..=100).contains(&fired), "fired {fired} times");
    Ok(())
}

#[test]
fn test_after_unlock_refresh_waits_for_pending_disconnect() -> TestResult {
    let config = RegistryConfig::builder()
        .dispatch(CallbackDispatch::AfterUnlock)
        .build()?;
    let registry = Arc::new(WatchdogRegistry::with_config(config)?);
    let enabled = Arc::new(AtomicBool::new(true));
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = parking_lot::Mutex::new(release_rx);

    let disable = Arc::clone(&enabled);
    let enable = Arc::clone(&enabled);
    registry.register(
        "motor",
        10,
        move || {
            let _entered = entered_tx.send(()).is_ok();
            let _released = release_rx.lock().recv().is_ok();
            disable.store(false, Ordering::SeqCst);
        },
        move || enable.store(true, Ordering::SeqCst),
    )?;

    let ticker = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.tick(10))
    };
    entered_rx.recv()?;

    // The disconnect callback is still pending when the link is fed.
    let refresher = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.refresh_by_name("motor"))
    };
    thread::sleep(Duration::from_millis(20));
    release_tx.send(())?;

    let fired = ticker
        .join()
        .map_err(|e| format!("tick thread panicked: {e:?}"))?;
    refresher
        .join()
        .map_err(|e| format!("refresh thread panicked: {e:?}"))??;

    assert_eq!(fired, 1);
    let motor = registry.entry_by_name("motor").ok_or("Expected motor entry")?;
    assert!(!motor.disconnected);
    assert_eq!(motor.refresh_count, 1);
    assert!(
        enabled.load(Ordering::SeqCst),
        "refresh callback must be delivered after the disconnect it follows"
    );
    Ok(())
}
