use std::env;
use std::str::FromStr;
use std::time::Duration;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const CORS_ALLOWED_ORIGIN: &str = "http://localhost:5173";
const OPENAI_MODEL: &str = "gpt-3.5-turbo";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

const BATCH_DAYS: usize = 5;
const MAX_CANDIDATES_PER_CATEGORY: usize = 20;
const USAGE_RESET_RATIO: f64 = 0.7;
const BATCH_DELAY_MS: u64 = 1000;
const BATCH_RETRIES: u32 = 1;
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

const GEOCODE_GROUP_SIZE: usize = 5;
const GEOCODE_DELAY_MS: u64 = 200;
const CACHE_TTL_SECS: u64 = 60 * 60 * 24; // 24 hours
const SEARCH_DISPLAY: u32 = 5;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Process-level settings: where to listen and which external services exist.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: Option<String>,
    pub cors_allowed_origin: String,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
    pub kakao_rest_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| HOST.to_string()),
            port: env_or("PORT", PORT),
            mongodb_uri: env_opt("MONGODB_URI"),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| CORS_ALLOWED_ORIGIN.to_string()),
            naver_client_id: env_opt("NAVER_CLIENT_ID"),
            naver_client_secret: env_opt("NAVER_CLIENT_SECRET"),
            kakao_rest_api_key: env_opt("KAKAO_REST_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| OPENAI_MODEL.to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_BASE_URL.to_string()),
        }
    }
}

/// Tunables for the batch pipeline that turns candidates into a course.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Days covered by one LLM call
    pub batch_days: usize,
    /// Prompt keeps at most this many unused places per category
    pub max_candidates_per_category: usize,
    /// Tracker is cleared once used names exceed this share of the pool
    pub usage_reset_ratio: f64,
    pub batch_delay: Duration,
    /// Extra attempts for a batch that came back with an empty day
    pub batch_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_days: BATCH_DAYS,
            max_candidates_per_category: MAX_CANDIDATES_PER_CATEGORY,
            usage_reset_ratio: USAGE_RESET_RATIO,
            batch_delay: Duration::from_millis(BATCH_DELAY_MS),
            batch_retries: BATCH_RETRIES,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            batch_days: env_or("COURSE_BATCH_DAYS", defaults.batch_days).max(1),
            max_candidates_per_category: env_or(
                "COURSE_MAX_CANDIDATES_PER_CATEGORY",
                defaults.max_candidates_per_category,
            ),
            usage_reset_ratio: env_or("COURSE_USAGE_RESET_RATIO", defaults.usage_reset_ratio),
            batch_delay: Duration::from_millis(env_or("COURSE_BATCH_DELAY_MS", BATCH_DELAY_MS)),
            batch_retries: env_or("COURSE_BATCH_RETRIES", defaults.batch_retries),
            temperature: env_or("COURSE_TEMPERATURE", defaults.temperature),
            max_tokens: env_or("COURSE_MAX_TOKENS", defaults.max_tokens),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Concurrent geocoding lookups per group
    pub geocode_group_size: usize,
    pub geocode_delay: Duration,
    pub cache_ttl: Duration,
    /// Results requested from a provider per query
    pub search_display: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            geocode_group_size: GEOCODE_GROUP_SIZE,
            geocode_delay: Duration::from_millis(GEOCODE_DELAY_MS),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            search_display: SEARCH_DISPLAY,
        }
    }
}

impl AggregatorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            geocode_group_size: env_or("GEOCODE_GROUP_SIZE", defaults.geocode_group_size).max(1),
            geocode_delay: Duration::from_millis(env_or("GEOCODE_DELAY_MS", GEOCODE_DELAY_MS)),
            cache_ttl: Duration::from_secs(env_or("PLACE_CACHE_TTL_SECS", CACHE_TTL_SECS)),
            search_display: env_or("PLACE_SEARCH_DISPLAY", defaults.search_display),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_generation_config_defaults() {
        env::remove_var("COURSE_BATCH_DAYS");
        env::remove_var("COURSE_USAGE_RESET_RATIO");

        let config = GenerationConfig::from_env();
        assert_eq!(config.batch_days, 5);
        assert_eq!(config.usage_reset_ratio, 0.7);
        assert_eq!(config.batch_delay, Duration::from_millis(1000));
    }

    #[test]
    #[serial]
    fn test_generation_config_env_override() {
        env::set_var("COURSE_BATCH_DAYS", "3");
        env::set_var("COURSE_USAGE_RESET_RATIO", "not-a-number");

        let config = GenerationConfig::from_env();
        assert_eq!(config.batch_days, 3);
        assert_eq!(config.usage_reset_ratio, 0.7);

        env::remove_var("COURSE_BATCH_DAYS");
        env::remove_var("COURSE_USAGE_RESET_RATIO");
    }

    #[test]
    #[serial]
    fn test_blank_credentials_are_treated_as_missing() {
        env::set_var("KAKAO_REST_API_KEY", "   ");
        let config = AppConfig::from_env();
        assert!(config.kakao_rest_api_key.is_none());
        env::remove_var("KAKAO_REST_API_KEY");
    }
}
