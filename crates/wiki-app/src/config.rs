//! Layered configuration: defaults, then an optional TOML file, then
//! environment variables, then CLI flags — the same precedence order the
//! teacher's `config` usage follows, generalized from the single
//! `FolderScanConfig` struct (`crates/serve/src/indexer.rs`) into the
//! handful of knobs this engine's subsystems actually need.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root directory C2 stores pages, history, and tombstones under.
    pub data_dir: PathBuf,
    /// Address the HTTP surface binds to.
    pub bind_addr: String,
    /// Channel capacity for each job queue registered with C5.
    pub queue_channel_capacity: usize,
    /// Write-lock stripes for C2 (spec.md §5's per-identifier serialization).
    pub write_stripes: usize,
    /// Directory the full-text index persists to; `None` keeps it in RAM,
    /// which is fine for small wikis and tests but loses the index on
    /// restart.
    #[serde(default)]
    pub text_index_dir: Option<PathBuf>,
    /// How often the inventory normalization job (C9) runs. Never on cold
    /// start (SPEC_FULL.md §D.2) — the first run is scheduled this many
    /// seconds after startup.
    pub inventory_normalize_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./wiki-data"),
            bind_addr: "127.0.0.1:8080".to_string(),
            queue_channel_capacity: 256,
            write_stripes: 16,
            text_index_dir: None,
            inventory_normalize_interval_secs: 3600,
        }
    }
}

/// CLI overrides. Unset flags fall through to the config file/environment,
/// which fall through to [`AppConfig::default`] — the same
/// config-then-build precedence the teacher's `StartCmd` establishes for
/// `WHISPERCMS_DIR` in `crates/adapt/src/cli.rs`.
#[derive(Debug, Parser)]
#[command(name = "wiki-app", version, about = "Personal wiki engine")]
pub struct Cli {
    /// Path to a TOML config file. Defaults to `./wiki.toml` if present.
    #[arg(long, env = "WIKI_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "WIKI_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, env = "WIKI_BIND_ADDR")]
    pub bind_addr: Option<String>,
}

pub fn load(cli: &Cli) -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
        .set_default("bind_addr", defaults.bind_addr.clone())?
        .set_default("queue_channel_capacity", defaults.queue_channel_capacity as i64)?
        .set_default("write_stripes", defaults.write_stripes as i64)?
        .set_default(
            "inventory_normalize_interval_secs",
            defaults.inventory_normalize_interval_secs as i64,
        )?;

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("wiki.toml"));
    builder = builder.add_source(config::File::from(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("WIKI").separator("_"));

    let mut loaded: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(dir) = &cli.data_dir {
        loaded.data_dir = dir.clone();
    }
    if let Some(addr) = &cli.bind_addr {
        loaded.bind_addr = addr.clone();
    }

    Ok(loaded)
}
