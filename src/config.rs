// Application settings, layered from defaults, an optional config file and APP_* env vars

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    // Base URL of the Directus items API, e.g. https://api.fluxcars.com
    pub directus_url: Option<String>,
    pub directus_token: Option<String>,
    // Outbound proxy for upstream requests
    pub proxy_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub static_dir: String,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("cache_ttl_secs", 300)?
            .set_default("request_timeout_secs", 10)?
            .set_default("static_dir", "static")?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // APP_DIRECTUS_URL, APP_CACHE_TTL_SECS, ...
            .add_source(Environment::with_prefix("APP").try_parsing(true));

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings.normalized())
    }

    // Blank env values count as unset; trailing slashes are dropped from the base URL
    fn normalized(mut self) -> Self {
        self.directus_url = self
            .directus_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self.directus_token = self.directus_token.filter(|t| !t.trim().is_empty());
        self.proxy_url = self.proxy_url.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests(directus_url: Option<&str>) -> Self {
        Settings {
            server_address: "127.0.0.1:0".to_string(),
            directus_url: directus_url.map(str::to_string),
            directus_token: None,
            proxy_url: None,
            cache_ttl_secs: 300,
            request_timeout_secs: 5,
            static_dir: "static".to_string(),
        }
        .normalized()
    }
}
