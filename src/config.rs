use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const CONFIG_VERSION: u32 = 1;

/// Multipart field names expected by the upload view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FormFields {
    pub archive: String,
    pub group: String,
    pub metadata: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            archive: "zip_file".to_string(),
            group: "folder_name".to_string(),
            metadata: "directory_structure".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Absolute upload URL (the form's configured action).
    pub endpoint: Option<String>,
    /// Origin used to resolve a relative form action, e.g. `https://studio.example.com`.
    pub base_url: Option<String>,
    /// Raw `Cookie` header value copied from an authenticated browser session.
    pub cookie: Option<String>,
    pub csrf_cookie_name: String,
    pub csrf_header_name: String,
    pub csrf_form_field: String,
    pub fields: FormFields,
    pub compression_level: i64,
    // 0 disables the request timeout
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            base_url: None,
            cookie: None,
            csrf_cookie_name: "csrftoken".to_string(),
            csrf_header_name: "X-CSRFToken".to_string(),
            csrf_form_field: "csrfmiddlewaretoken".to_string(),
            fields: FormFields::default(),
            compression_level: 6,
            timeout_secs: 600,
            max_retries: 1,
            version: Some(CONFIG_VERSION),
        }
    }
}

impl Config {
    /// Load `~/.reelpack/config.json`, creating the directory and a default
    /// config on first run.
    pub fn init() -> Result<Self> {
        let config_dir = config_dir()?;
        let config_path = config_dir.join("config.json");
        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)
                .with_context(|| format!("cannot create {}", config_dir.display()))?;
        }
        if !config_path.exists() {
            Config::default().save_to(&config_path)?;
        }
        Ok(Config::read_from(&config_path))
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_dir()?.join("config.json");
        self.save_to(&path)?;
        Ok(path)
    }

    /// Deflate level clamped to 1..=9.
    pub fn effective_compression_level(&self) -> i64 {
        self.compression_level.clamp(1, 9)
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(self.timeout_secs))
        }
    }
}

/// `~/.reelpack`
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot find user's home dir")?;
    Ok(home.join(".".to_owned() + env!("CARGO_PKG_NAME")))
}

/// `~/.reelpack/logs`, the fixed location for failure lists and verbose logs.
pub fn logs_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("logs"))
}

pub(crate) trait StorageObject {
    fn pretty_json(&self) -> String;
    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        Self: Serialize;
    fn read_from<T: Default + DeserializeOwned + Serialize, P: AsRef<Path>>(path: P) -> T;
}

impl<T: Serialize> StorageObject for T {
    fn pretty_json(&self) -> String {
        match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("serialize failed: {}, falling back to empty object", e);
                "{}".to_string()
            }
        }
    }

    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.pretty_json())
            .with_context(|| format!("cannot write {}", path.display()))
    }

    fn read_from<R: Default + DeserializeOwned + Serialize, P: AsRef<Path>>(path: P) -> R {
        let v = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return R::default(),
        };
        match serde_json::from_str::<R>(&v) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("⚠️ failed to parse config JSON: {}, using defaults", e);
                R::default()
            }
        }
    }
}
