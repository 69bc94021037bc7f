use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Command;
use crate::settings::{validate_debounce_ms, validate_hotkey, validate_max_results};

const APP_DIR_NAME: &str = "quickbar";
const CONFIG_FILE_NAME: &str = "config.json";
const HISTORY_DB_FILE_NAME: &str = "history.sqlite3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WebSearchProvider {
    #[default]
    Duckduckgo,
    Google,
    Bing,
    Brave,
    Startpage,
    Ecosia,
    Yahoo,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CommandGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_results: u16,
    pub debounce_ms: u64,
    /// Text length at which a "Show as QR code" result is offered; 0 disables it.
    pub qr_threshold: usize,
    pub currency_api_key: String,
    pub currency_base: String,
    pub rate_cache_ttl_secs: u64,
    pub rate_grace_secs: u64,
    pub web_search_provider: WebSearchProvider,
    pub web_search_custom_template: String,
    pub file_roots: Vec<PathBuf>,
    pub file_scan_limit: usize,
    pub file_scan_depth: usize,
    pub app_roots: Vec<PathBuf>,
    pub app_scan_limit: usize,
    pub clipboard_enabled: bool,
    pub clipboard_exclude_sensitive_patterns: Vec<String>,
    pub recent_limit: usize,
    pub groups: Vec<CommandGroup>,
    pub commands: Vec<Command>,
    #[serde(skip)]
    pub config_path: PathBuf,
    pub history_db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            max_results: 20,
            debounce_ms: 40,
            qr_threshold: 0,
            currency_api_key: String::new(),
            currency_base: "USD".to_string(),
            rate_cache_ttl_secs: 3600,
            rate_grace_secs: 86_400,
            web_search_provider: WebSearchProvider::default(),
            web_search_custom_template: String::new(),
            file_roots: default_file_roots(),
            file_scan_limit: 2000,
            file_scan_depth: 4,
            app_roots: default_app_roots(),
            app_scan_limit: 1000,
            clipboard_enabled: true,
            clipboard_exclude_sensitive_patterns: vec![
                "password".to_string(),
                "secret".to_string(),
                "token".to_string(),
            ],
            recent_limit: 50,
            groups: Vec::new(),
            commands: Vec::new(),
            config_path: base.join(CONFIG_FILE_NAME),
            history_db_path: base.join(HISTORY_DB_FILE_NAME),
        }
    }
}

impl Config {
    pub fn group_name(&self, group_id: &str) -> Option<&str> {
        if group_id.is_empty() {
            return None;
        }
        self.groups
            .iter()
            .find(|group| group.id == group_id)
            .map(|group| group.name.as_str())
    }

    pub fn enabled_commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|command| command.enabled)
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    let root = std::env::var_os("APPDATA")
        .or_else(|| std::env::var_os("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir);
    root.join(APP_DIR_NAME)
}

fn default_file_roots() -> Vec<PathBuf> {
    let Some(home) = std::env::var_os("USERPROFILE").or_else(|| std::env::var_os("HOME")) else {
        return Vec::new();
    };
    let home = PathBuf::from(home);
    vec![home.join("Documents"), home.join("Desktop"), home.join("Downloads")]
}

fn default_app_roots() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let mut roots = Vec::new();
        if let Some(program_data) = std::env::var_os("ProgramData") {
            roots.push(PathBuf::from(program_data).join(r"Microsoft\Windows\Start Menu\Programs"));
        }
        if let Some(app_data) = std::env::var_os("APPDATA") {
            roots.push(PathBuf::from(app_data).join(r"Microsoft\Windows\Start Menu\Programs"));
        }
        roots
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Applications")]
    } else {
        vec![PathBuf::from("/usr/share/applications")]
    }
}

/// Loads JSON5 (`.json`/`.json5`) or TOML (`.toml`); a missing file yields defaults.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Config::default().config_path);

    if !path.exists() {
        return Ok(Config {
            config_path: path,
            ..Config::default()
        });
    }

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let mut cfg = parse_config(&path, &raw)?;
    cfg.config_path = path;
    validate(&cfg)?;
    Ok(cfg)
}

fn parse_config(path: &Path, raw: &str) -> Result<Config, ConfigError> {
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed = if is_toml {
        toml::from_str::<Config>(raw).map_err(|error| error.to_string())
    } else {
        json5::from_str::<Config>(raw).map_err(|error| error.to_string())
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = serde_json::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, encoded).map_err(|source| ConfigError::Write {
        path: cfg.config_path.clone(),
        source,
    })
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    validate_max_results(cfg.max_results).map_err(ConfigError::Invalid)?;
    validate_debounce_ms(cfg.debounce_ms).map_err(ConfigError::Invalid)?;

    if cfg.currency_base.trim().len() != 3 {
        return Err(ConfigError::Invalid(format!(
            "currency_base must be a three-letter code, got '{}'",
            cfg.currency_base
        )));
    }

    if cfg.rate_cache_ttl_secs == 0 {
        return Err(ConfigError::Invalid("rate_cache_ttl_secs must be positive".into()));
    }

    if cfg.web_search_provider == WebSearchProvider::Custom
        && !cfg.web_search_custom_template.contains("{query}")
    {
        return Err(ConfigError::Invalid(
            "web_search_custom_template must contain {query}".into(),
        ));
    }

    for command in &cfg.commands {
        if command.keyword.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "command '{}' has an empty keyword",
                command.id
            )));
        }
        if let Some(hotkey) = command.hotkey.as_deref() {
            validate_hotkey(hotkey).map_err(|error| {
                ConfigError::Invalid(format!("command '{}' hotkey: {error}", command.keyword))
            })?;
        }
    }

    Ok(())
}

/// Read-only configuration snapshot source consumed by each search.
pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self) -> Arc<Config>;
}

pub struct StaticConfig {
    config: Arc<Config>,
}

impl StaticConfig {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl ConfigProvider for StaticConfig {
    fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}
