use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.brewerydb.com/v2";

// ---------------------------------------------------------------------------
// ConfigFile: deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub style_id: Option<u32>,
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub viewer: ViewerConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfigFile {
    pub scroll_step: Option<u32>,
    pub frame_budget_ms: Option<u64>,
    pub prefetch_ahead: Option<usize>,
}

// ---------------------------------------------------------------------------
// Config: resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub style_id: u32,
    pub request_timeout: Duration,
    pub viewer: ViewerConfig,
}

pub struct ViewerConfig {
    pub scroll_step: u32,
    pub frame_budget: Duration,
    /// Rows below the viewport reported as "about to be visible".
    pub prefetch_ahead: usize,
}

/// Values given on the command line; `None` leaves the file value alone.
#[derive(Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub style_id: Option<u32>,
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if let Some(ref v) = cli.base_url {
            debug!("config: CLI override base_url={v}");
            self.base_url = cli.base_url;
        }
        if cli.api_key.is_some() {
            debug!("config: CLI override api_key=<redacted>");
            self.api_key = cli.api_key;
        }
        if let Some(v) = cli.style_id {
            debug!("config: CLI override style_id={v}");
            self.style_id = cli.style_id;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields.
    pub fn resolve(self) -> Config {
        let config = Config {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            // The API key may also come from the environment, never logged.
            api_key: self
                .api_key
                .or_else(|| std::env::var("BEERSCROLL_API_KEY").ok())
                .filter(|k| !k.is_empty()),
            style_id: self.style_id.unwrap_or(3),
            request_timeout: Duration::from_millis(self.request_timeout_ms.unwrap_or(10_000)),
            viewer: ViewerConfig {
                scroll_step: self.viewer.scroll_step.unwrap_or(1),
                frame_budget: Duration::from_millis(self.viewer.frame_budget_ms.unwrap_or(32)),
                prefetch_ahead: self.viewer.prefetch_ahead.unwrap_or(10),
            },
        };
        info!(
            "config: resolved base_url={}, api_key={}, style_id={}, request_timeout={}ms, \
             scroll_step={}, frame_budget={}ms, prefetch_ahead={}",
            config.base_url,
            if config.api_key.is_some() { "set" } else { "unset" },
            config.style_id,
            config.request_timeout.as_millis(),
            config.viewer.scroll_step,
            config.viewer.frame_budget.as_millis(),
            config.viewer.prefetch_ahead,
        );
        config
    }
}

/// Resolve the XDG config path for beerscroll.
fn config_path() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
        })?;
    Some(config_dir.join("beerscroll").join("config.toml"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}
