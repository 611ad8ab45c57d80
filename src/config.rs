use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_minutes: u32,

    /// Minimum gap between two non-forced passes.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Non-manual articles older than this are pruned after each pass.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Non-forced passes are skipped when no visitor has been seen for
    /// this long.
    #[serde(default = "default_idle_skip_secs")]
    pub idle_skip_secs: u64,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Same-origin endpoint the sanitizer routes image URLs through.
    #[serde(default = "default_image_proxy_path")]
    pub image_proxy_path: String,

    #[serde(default = "default_sites")]
    pub sites: Vec<SiteConfig>,
}

/// One configured source site. Validated at load so a malformed entry
/// fails at startup, not at first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Origin used to resolve relative links, e.g. "https://new.xianbao.fun".
    pub domain: String,
    pub list_url: String,
    /// CSS selector for listing rows.
    #[serde(default = "default_row_selector")]
    pub row_selector: String,
    /// Article-body selectors, tried in order.
    #[serde(default)]
    pub content_selectors: Vec<String>,
}

fn default_db_path() -> String {
    let data_dir = std::env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("dealfeed")
        });
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("dealfeed.db").to_string_lossy().to_string()
}

fn default_scrape_interval() -> u32 {
    10
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_retention_days() -> u32 {
    4
}

fn default_idle_skip_secs() -> u64 {
    86_400
}

fn default_per_page() -> u32 {
    30
}

fn default_image_proxy_path() -> String {
    "/img_proxy".to_string()
}

fn default_row_selector() -> String {
    "tr, li".to_string()
}

fn default_sites() -> Vec<SiteConfig> {
    vec![SiteConfig {
        name: "xianbao".to_string(),
        domain: "https://new.xianbao.fun".to_string(),
        list_url: "https://new.xianbao.fun/".to_string(),
        row_selector: default_row_selector(),
        content_selectors: vec![
            "td.t_f".to_string(),
            "div.message".to_string(),
            "div[class*='content']".to_string(),
        ],
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scrape_interval_minutes: default_scrape_interval(),
            cooldown_secs: default_cooldown_secs(),
            retention_days: default_retention_days(),
            idle_skip_secs: default_idle_skip_secs(),
            per_page: default_per_page(),
            image_proxy_path: default_image_proxy_path(),
            sites: default_sites(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dealfeed")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(AppError::Config("no sites configured".to_string()));
        }
        if self.per_page == 0 {
            return Err(AppError::Config("per_page must be positive".to_string()));
        }
        for site in &self.sites {
            site.validate()?;
        }
        Ok(())
    }

    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Config("site with empty name".to_string()));
        }
        Url::parse(&self.domain).map_err(|e| {
            AppError::Config(format!(
                "site {}: bad domain {:?}: {}",
                self.name, self.domain, e
            ))
        })?;
        Url::parse(&self.list_url).map_err(|e| {
            AppError::Config(format!(
                "site {}: bad list_url {:?}: {}",
                self.name, self.list_url, e
            ))
        })?;
        Selector::parse(&self.row_selector).map_err(|e| {
            AppError::Config(format!(
                "site {}: bad row_selector {:?}: {}",
                self.name, self.row_selector, e
            ))
        })?;
        for sel in &self.content_selectors {
            Selector::parse(sel).map_err(|e| {
                AppError::Config(format!(
                    "site {}: bad content selector {:?}: {}",
                    self.name, sel, e
                ))
            })?;
        }
        Ok(())
    }
}
