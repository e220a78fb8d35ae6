use std::sync::Arc;

use sitrep_core::{Config, MemoryStore, ScanEngine};

use crate::common::{runtime, JsonLineSink};

pub fn run(interval: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(minutes) = interval {
        config.set_interval_min(minutes)?;
    }

    // Demo store; a deployment substitutes its remote store behind the
    // same trait.
    let store = Arc::new(MemoryStore::new());
    let (engine, handle) = ScanEngine::from_config(&config, store, Arc::new(JsonLineSink))?;

    let rt = runtime()?;
    rt.block_on(async move {
        let engine_task = tokio::spawn(engine.run());
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.shutdown();
        }
        let _ = engine_task.await;
    });
    Ok(())
}
