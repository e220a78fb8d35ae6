use std::sync::Arc;

use sitrep_core::{Config, MemoryStore, NullSink, ScanEngine};

use crate::common::runtime;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = Arc::new(MemoryStore::new());
    let (mut engine, _handle) = ScanEngine::from_config(&config, store, Arc::new(NullSink))?;

    let rt = runtime()?;
    let outcome = rt.block_on(engine.scan_once())?;

    println!("{}", serde_json::to_string_pretty(&outcome.stored)?);
    if !outcome.has_updates {
        eprintln!("no new developments in the requested window");
    }
    Ok(())
}
