use crate::nav::NavMode;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LxrConfig {
    #[serde(default)]
    pub nav: NavConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// [nav] section configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NavConfig {
    /// Navigation style: "incremental", "popup" or "off"
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Address-line watchdog poll interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// [listing] section configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Rows served inline before the rest is deferred to lazy fragments
    #[serde(default = "default_fragment_rows")]
    pub fragment_rows: usize,
}

/// [display] section configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub line_numbers: bool,
    #[serde(default = "default_true")]
    pub syntax_highlight: bool,
}

fn default_mode() -> String {
    "incremental".to_string()
}

fn default_poll_interval() -> u64 {
    50
}

fn default_fragment_rows() -> usize {
    500
}

fn default_true() -> bool {
    true
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            fragment_rows: default_fragment_rows(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            line_numbers: true,
            syntax_highlight: true,
        }
    }
}

impl LxrConfig {
    /// The configured navigation mode as an enum; unrecognized values fall
    /// back to incremental.
    pub fn nav_mode(&self) -> NavMode {
        match self.nav.mode.as_str() {
            "popup" => NavMode::Popup,
            "off" => NavMode::Off,
            _ => NavMode::Incremental,
        }
    }
}

/// Load config from ~/.config/lxrview/config.toml, falling back to
/// built-in defaults when the file is missing or malformed.
pub fn load_config() -> LxrConfig {
    let path = dirs::config_dir().map(|d| d.join("lxrview/config.toml"));
    let Some(path) = path else {
        return LxrConfig::default();
    };
    std::fs::read_to_string(path)
        .ok()
        .and_then(|c| toml::from_str(&c).ok())
        .unwrap_or_default()
}
