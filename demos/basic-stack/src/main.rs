//! Basic stack bring-up example
//!
//! Installs a stack manager over a toy beacon engine, starts the
//! processing task, feeds it beacons from a fake radio interrupt, and reads
//! engine state from the main thread under the stack gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use tracing::info;

use meshrun_core::{MeshError, MeshResult, StackConfig};
use meshrun_runtime::{logging, registry, EngineHooks, ProtocolEngine, StackManager};

/// Counts beacons the radio has delivered and the drain passes that saw them
#[derive(Default)]
struct BeaconEngine {
    hooks: OnceLock<EngineHooks>,
    received: AtomicU64,
    handled: AtomicU64,
}

impl BeaconEngine {
    /// Radio receive interrupt. Touches only atomics and write-once hooks.
    fn on_radio_irq(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        if let Some(hooks) = self.hooks.get() {
            hooks.signal_pending_from_isr();
        }
    }
}

impl ProtocolEngine for BeaconEngine {
    fn system_init(&self, hooks: EngineHooks) -> MeshResult<()> {
        self.hooks
            .set(hooks)
            .map_err(|_| MeshError::AlreadyInitialized)
    }

    fn process_pending(&self) {
        let received = self.received.load(Ordering::Relaxed);
        self.handled.store(received, Ordering::Relaxed);
    }
}

fn main() -> MeshResult<()> {
    logging::init("info");
    info!("=== meshrun basic stack example ===");

    let engine = Arc::new(BeaconEngine::default());
    let manager = StackManager::new(
        engine.clone(),
        StackConfig::default().with_task_name("beacon-stack"),
    );
    let manager = registry::install(manager)?;

    manager.init_stack()?;
    manager.start_task()?;

    let radio = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..20 {
                engine.on_radio_irq();
                thread::sleep(Duration::from_millis(5));
            }
        })
    };
    radio
        .join()
        .map_err(|_| MeshError::Internal("radio thread panicked".into()))?;
    thread::sleep(Duration::from_millis(20));

    {
        let _guard = manager.stack_guard()?;
        info!(
            received = engine.received.load(Ordering::Relaxed),
            handled = engine.handled.load(Ordering::Relaxed),
            "engine state"
        );
    }

    let stats = manager.stats();
    info!(
        wakeups = stats.wakeups,
        drain_passes = stats.drain_passes,
        last_drain_us = stats.last_drain_duration.as_micros() as u64,
        "processing task stats"
    );
    Ok(())
}
