//! Bot config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use muninn_core::error::{BotError, Result};

pub use schema::{BotConfig, BotSection, HomeserverSection, Messages, RoomsSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<BotConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| BotError::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<BotConfig> {
    let cfg: BotConfig = serde_yaml::from_str(s)
        .map_err(|e| BotError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
