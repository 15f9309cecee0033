use std::{env, str::FromStr, time::Duration};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, GeminiConfig, ListConfig, LoggingConfig,
    RelevanceConfig, ScanConfig, SchedulerConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let gemini_defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            model: env::var("GEMINI_MODEL").unwrap_or(gemini_defaults.model),
            base_url: env::var("GEMINI_BASE_URL").unwrap_or(gemini_defaults.base_url),
            temperature: parse_or("GEMINI_TEMPERATURE", gemini_defaults.temperature)?,
            max_output_tokens: parse_or("GEMINI_MAX_OUTPUT_TOKENS", gemini_defaults.max_output_tokens)?,
            timeout: millis_or("GEMINI_TIMEOUT_MS", gemini_defaults.timeout)?,
        };

        let rel = RelevanceConfig::default();
        let relevance = RelevanceConfig {
            threshold: parse_or("RELEVANCE_THRESHOLD", rel.threshold)?,
            threshold_low: parse_or("RELEVANCE_THRESHOLD_LOW", rel.threshold_low)?,
            title_weight: parse_or("TITLE_WEIGHT", rel.title_weight)?,
            url_weight: parse_or("URL_WEIGHT", rel.url_weight)?,
            content_weight: parse_or("CONTENT_WEIGHT", rel.content_weight)?,
            matched_terms_limit: parse_or("MATCHED_TERMS_LIMIT", rel.matched_terms_limit)?,
            auto_close_delay: millis_or("AUTO_CLOSE_DELAY_MS", rel.auto_close_delay)?,
            large_keyword_set_size: parse_or("LARGE_KEYWORD_SET_SIZE", rel.large_keyword_set_size)?,
        };
        if relevance.threshold_low > relevance.threshold {
            return Err(ConfigError::Inconsistent(
                "RELEVANCE_THRESHOLD_LOW",
                "RELEVANCE_THRESHOLD",
            ));
        }

        let scan_defaults = ScanConfig::default();
        let scan = ScanConfig {
            batch_size: parse_or("SCAN_BATCH_SIZE", scan_defaults.batch_size)?.max(1),
            initial_batch_size: parse_or("SCAN_INITIAL_BATCH_SIZE", scan_defaults.initial_batch_size)?
                .max(1),
            search_batch_size: parse_or("SCAN_SEARCH_BATCH_SIZE", scan_defaults.search_batch_size)?
                .max(1),
            max_visible: parse_or("SCAN_MAX_VISIBLE", scan_defaults.max_visible)?,
            chunk_size: parse_or("SCAN_CHUNK_SIZE", scan_defaults.chunk_size)?.max(1),
            chunk_yield: millis_or("SCAN_CHUNK_YIELD_MS", scan_defaults.chunk_yield)?,
            processing_delay: millis_or("SCAN_PROCESSING_DELAY_MS", scan_defaults.processing_delay)?,
            max_delay: millis_or("SCAN_MAX_DELAY_MS", scan_defaults.max_delay)?,
            viewport_buffer: parse_or("SCAN_VIEWPORT_BUFFER_PX", scan_defaults.viewport_buffer)?,
            error_threshold: parse_or("SCAN_ERROR_THRESHOLD", scan_defaults.error_threshold)?,
            error_window: Duration::from_secs(parse_or(
                "SCAN_ERROR_WINDOW_SECS",
                scan_defaults.error_window.as_secs(),
            )?),
            backoff_factor: parse_or("SCAN_BACKOFF_FACTOR", scan_defaults.backoff_factor)?.max(1.0),
            debounce: millis_or("SCAN_DEBOUNCE_MS", scan_defaults.debounce)?,
        };
        if scan.processing_delay > scan.max_delay {
            return Err(ConfigError::Inconsistent(
                "SCAN_PROCESSING_DELAY_MS",
                "SCAN_MAX_DELAY_MS",
            ));
        }

        let lists = ListConfig {
            hidden_disables_matching: parse_or("HIDDEN_DISABLES_MATCHING", false)?,
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "focus-filter.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let scheduler = SchedulerConfig {
            reconcile_cron: env::var("RECONCILE_CRON")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "*/30 * * * * *".to_string()),
        };

        Ok(Self {
            gemini,
            relevance,
            scan,
            lists,
            directories,
            logging,
            scheduler,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

fn millis_or(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = parse_or(key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: usize = parse_or("FOCUS_FILTER_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        env::set_var("FOCUS_FILTER_TEST_GARBAGE_KEY", "twelve");
        let result: Result<usize, _> = parse_or("FOCUS_FILTER_TEST_GARBAGE_KEY", 1);
        env::remove_var("FOCUS_FILTER_TEST_GARBAGE_KEY");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn millis_or_reads_milliseconds() {
        env::set_var("FOCUS_FILTER_TEST_MILLIS_KEY", "1500");
        let value = millis_or("FOCUS_FILTER_TEST_MILLIS_KEY", Duration::from_millis(1)).unwrap();
        env::remove_var("FOCUS_FILTER_TEST_MILLIS_KEY");
        assert_eq!(value, Duration::from_millis(1500));
    }
}
