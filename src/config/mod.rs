//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::chart::ChartSettings;
use crate::market_data::{TIC_SCOPES, Timeframe, WindowConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Stock codes available in the symbol selector
    pub symbols: Vec<String>,

    /// Timeframe shown on startup
    pub default_timeframe: Timeframe,

    /// Minute bucket size for the minute timeframe
    pub tic_scope: u32,

    /// UI refresh rate in milliseconds
    pub refresh_rate_ms: u64,

    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,

    /// Chart backend endpoints
    pub backend: BackendConfig,

    /// Chart window and formatting
    #[serde(default)]
    pub chart: ChartConfig,

    /// UI-specific configuration
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// REST API base URL
    pub rest_url: String,

    /// STOMP WebSocket endpoint
    pub ws_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Fixed delay between push channel reconnect attempts
    pub reconnect_interval_ms: u64,

    /// Transaction id sent when announcing a realtime subscription
    pub realtime_tr_id: String,

    /// Transaction id for current price queries
    pub price_tr_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Maximum number of records handed to the panes
    pub page_size: usize,

    /// Records revealed per edge pan
    pub page_increment: usize,

    /// Bars from either end that count as "at the edge"
    pub edge_margin: usize,

    /// Value axis padding as a fraction of the price span
    pub value_padding_ratio: f64,

    /// Appended to formatted prices
    pub currency_suffix: String,

    /// Exchange offset from UTC, used to bucket live ticks
    pub market_utc_offset_minutes: i32,

    /// Fetch older pages when panning past the loaded history
    pub enable_history_paging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Enable colors in TUI
    pub enable_colors: bool,

    /// TUI update rate in FPS
    pub update_rate_fps: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the log file
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec!["005930".to_string()],
            default_timeframe: Timeframe::Daily,
            tic_scope: 1,
            refresh_rate_ms: 100,
            log_level: "info".to_string(),
            log: LogConfig::default(),
            backend: BackendConfig::default(),
            chart: ChartConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:8080".to_string(),
            ws_url: "ws://localhost:8080/stock-websocket/websocket".to_string(),
            timeout_seconds: 10,
            reconnect_interval_ms: 5000,
            realtime_tr_id: "0B".to_string(),
            price_tr_id: "ka10001".to_string(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        let window = WindowConfig::default();
        Self {
            page_size: window.page_size,
            page_increment: window.page_increment,
            edge_margin: window.edge_margin,
            value_padding_ratio: window.value_padding_ratio,
            currency_suffix: "원".to_string(),
            market_utc_offset_minutes: 540,
            enable_history_paging: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enable_colors: true,
            update_rate_fps: 20,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/stockchart.log".to_string(),
        }
    }
}

impl ChartConfig {
    /// Controller settings derived from this section
    pub fn settings(&self) -> ChartSettings {
        ChartSettings {
            window: WindowConfig {
                page_size: self.page_size,
                page_increment: self.page_increment,
                edge_margin: self.edge_margin,
                value_padding_ratio: self.value_padding_ratio,
            },
            currency_suffix: self.currency_suffix.clone(),
            enable_history_paging: self.enable_history_paging,
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary `STOCKCHART_*` lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // STOCKCHART_SYMBOLS - comma-separated list of stock codes
        if let Some(symbols) = lookup("STOCKCHART_SYMBOLS") {
            self.symbols = symbols
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(timeframe) = lookup("STOCKCHART_DEFAULT_TIMEFRAME") {
            if let Ok(value) = timeframe.parse::<Timeframe>() {
                self.default_timeframe = value;
            }
        }

        if let Some(scope) = lookup("STOCKCHART_TIC_SCOPE") {
            if let Ok(value) = scope.parse::<u32>() {
                self.tic_scope = value;
            }
        }

        if let Some(refresh_rate) = lookup("STOCKCHART_REFRESH_RATE_MS") {
            if let Ok(value) = refresh_rate.parse::<u64>() {
                self.refresh_rate_ms = value;
            }
        }

        if let Some(log_level) = lookup("STOCKCHART_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Some(file_path) = lookup("STOCKCHART_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // Backend endpoints
        if let Some(rest_url) = lookup("STOCKCHART_BACKEND_REST_URL") {
            self.backend.rest_url = rest_url;
        }

        if let Some(ws_url) = lookup("STOCKCHART_BACKEND_WS_URL") {
            self.backend.ws_url = ws_url;
        }

        if let Some(timeout) = lookup("STOCKCHART_BACKEND_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.backend.timeout_seconds = value;
            }
        }

        if let Some(interval) = lookup("STOCKCHART_BACKEND_RECONNECT_INTERVAL_MS") {
            if let Ok(value) = interval.parse::<u64>() {
                self.backend.reconnect_interval_ms = value;
            }
        }

        // Chart window
        if let Some(size) = lookup("STOCKCHART_CHART_PAGE_SIZE") {
            if let Ok(value) = size.parse::<usize>() {
                self.chart.page_size = value;
            }
        }

        if let Some(paging) = lookup("STOCKCHART_CHART_ENABLE_HISTORY_PAGING") {
            self.chart.enable_history_paging = paging.parse().unwrap_or(self.chart.enable_history_paging);
        }

        // UI
        if let Some(enable_colors) = lookup("STOCKCHART_UI_ENABLE_COLORS") {
            self.ui.enable_colors = enable_colors.parse().unwrap_or(self.ui.enable_colors);
        }

        if let Some(fps) = lookup("STOCKCHART_UI_UPDATE_RATE_FPS") {
            if let Ok(value) = fps.parse::<u32>() {
                self.ui.update_rate_fps = value;
            }
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {}, using defaults", err);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            anyhow::bail!("At least one symbol must be specified");
        }

        for symbol in &self.symbols {
            if !Self::is_valid_symbol(symbol) {
                anyhow::bail!("Invalid stock code: {}", symbol);
            }
        }

        if !TIC_SCOPES.contains(&self.tic_scope) {
            anyhow::bail!(
                "tic_scope must be one of {:?}, got {}",
                TIC_SCOPES,
                self.tic_scope
            );
        }

        if self.refresh_rate_ms == 0 {
            anyhow::bail!("Refresh rate must be greater than 0");
        }

        if self.backend.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.backend.reconnect_interval_ms == 0 {
            anyhow::bail!("backend.reconnect_interval_ms must be greater than 0");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        if self.chart.page_size == 0 || self.chart.page_increment == 0 {
            anyhow::bail!("chart.page_size and chart.page_increment must be greater than 0");
        }

        if self.chart.page_increment > self.chart.page_size {
            anyhow::bail!("chart.page_increment must not exceed chart.page_size");
        }

        if self.chart.edge_margin * 2 >= self.chart.page_size {
            anyhow::bail!("chart.edge_margin must be less than half of chart.page_size");
        }

        if !(0.0..=1.0).contains(&self.chart.value_padding_ratio) {
            anyhow::bail!("chart.value_padding_ratio must be between 0 and 1");
        }

        Ok(())
    }

    /// Stock codes are short alphanumeric strings such as `005930`
    pub fn is_valid_symbol(symbol: &str) -> bool {
        (3..=12).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// Normalize user input into a stock code
    pub fn normalize_symbol(symbol: &str) -> String {
        symbol.trim().to_uppercase()
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(self).context("Failed to serialize configuration")?);
        Ok(())
    }

    /// Display configuration management help
    pub fn display_help() -> Result<()> {
        println!("Configuration management commands:");
        println!("  stockchart config show    - Show current configuration");
        println!("  stockchart config reset   - Write the default configuration");
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command(action: &Option<crate::cli::ConfigAction>, path: &Path) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) => {
                let config = Config::load_or_default(path);
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.save_to_file(path)?;
                println!("Default configuration written to {}", path.display());
            }
            None => {
                Config::display_help()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbols, vec!["005930"]);
        assert_eq!(config.chart.page_size, 60);
        assert_eq!(config.backend.reconnect_interval_ms, 5000);
    }

    #[test]
    fn test_symbol_validation() {
        assert!(Config::is_valid_symbol("005930"));
        assert!(!Config::is_valid_symbol("00"));
        assert!(!Config::is_valid_symbol("005 930"));
        assert_eq!(Config::normalize_symbol(" a005930 "), "A005930");
    }

    #[test]
    fn test_invalid_tic_scope_rejected() {
        let config = Config {
            tic_scope: 7,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_settings_rejected() {
        let mut config = Config::default();
        config.chart.page_increment = config.chart.page_size + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chart.edge_margin = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOCKCHART_SYMBOLS", "005930, 000660"),
            ("STOCKCHART_DEFAULT_TIMEFRAME", "weekly"),
            ("STOCKCHART_BACKEND_REST_URL", "http://backend:9000"),
            ("STOCKCHART_TIC_SCOPE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.symbols, vec!["005930", "000660"]);
        assert_eq!(config.default_timeframe, Timeframe::Weekly);
        assert_eq!(config.backend.rest_url, "http://backend:9000");
        assert_eq!(config.tic_scope, 1);
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();

        // Test save
        config.save_to_file(temp_file.path()).unwrap();

        // Test load
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.symbols, loaded_config.symbols);
        assert_eq!(loaded_config.chart.currency_suffix, "원");
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let toml = r#"
symbols = ["000660"]
default_timeframe = "monthly"
tic_scope = 5
refresh_rate_ms = 50
log_level = "debug"

[log]
file_path = "logs/test.log"

[backend]
rest_url = "http://localhost:1"
ws_url = "ws://localhost:1/ws"
timeout_seconds = 3
reconnect_interval_ms = 100
realtime_tr_id = "0B"
price_tr_id = "ka10001"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_timeframe, Timeframe::Monthly);
        assert_eq!(config.chart.page_increment, 30);
        assert!(config.ui.enable_colors);
    }
}
