use crate::client::ClientConfig;
use crate::search::SearchConfig;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_CACHE_DIR: &str = "data/cache";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub client: ClientConfig,
    pub search: SearchConfig,
    /// Directory holding one JSON store per lookup kind.
    pub cache_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            search: SearchConfig::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl EngineConfig {
    /// Defaults overridden by `RIOT_API_KEY`, `DEGREES_PLATFORM`,
    /// `DEGREES_CACHE_DIR`, `DEGREES_BREADTH`, `DEGREES_DEPTH` and
    /// `DEGREES_MAX_RETRIES`. Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.client.api_key = std::env::var("RIOT_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(platform) = std::env::var("DEGREES_PLATFORM") {
            config.client.base_url = platform_url(&platform);
        }
        config.client.max_retries = env_parse("DEGREES_MAX_RETRIES");

        if let Ok(dir) = std::env::var("DEGREES_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        config.search.breadth_limit =
            env_parse("DEGREES_BREADTH").unwrap_or(config.search.breadth_limit);
        config.search.depth = env_parse("DEGREES_DEPTH").unwrap_or(config.search.depth);

        config
    }
}

/// `na1` -> `https://na1.api.riotgames.com`; full URLs pass through.
pub fn platform_url(platform: &str) -> String {
    let platform = platform.trim().trim_end_matches('/');
    if platform.contains("://") {
        platform.to_string()
    } else {
        format!("https://{}.api.riotgames.com", platform.to_lowercase())
    }
}
