//! Tessera studio: a window hosting the engine's demo scenes.
//!
//! Keys: 1-5 pick a scene, 0 or Escape return to the menu, arrows move the
//! selected item, Tab selects the next item, C cycles the clear color.

mod clock;
mod config;
mod input;
mod runtime;
mod scenes;
mod studio;

use anyhow::Result;
use tessera_engine::device::GpuInit;
use tessera_engine::logging::{init_logging, LoggingConfig};

use crate::config::RuntimeConfig;
use crate::runtime::Runtime;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(RuntimeConfig::default(), GpuInit::default())
}
