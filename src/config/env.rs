use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub relevance: RelevanceConfig,
    pub scan: ScanConfig,
    pub lists: ListConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RelevanceConfig {
    pub threshold: f64,
    pub threshold_low: f64,
    pub title_weight: f64,
    pub url_weight: f64,
    pub content_weight: f64,
    pub matched_terms_limit: usize,
    pub auto_close_delay: Duration,
    pub large_keyword_set_size: usize,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub batch_size: usize,
    pub initial_batch_size: usize,
    pub search_batch_size: usize,
    pub max_visible: usize,
    pub chunk_size: usize,
    pub chunk_yield: Duration,
    pub processing_delay: Duration,
    pub max_delay: Duration,
    pub viewport_buffer: f64,
    pub error_threshold: u32,
    pub error_window: Duration,
    pub backoff_factor: f64,
    pub debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct ListConfig {
    pub hidden_disables_matching: bool,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub reconcile_cron: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} must not exceed {1}")]
    Inconsistent(&'static str, &'static str),
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            threshold_low: 0.15,
            title_weight: 3.0,
            url_weight: 2.0,
            content_weight: 1.0,
            matched_terms_limit: 10,
            auto_close_delay: Duration::from_millis(500),
            large_keyword_set_size: 200,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            initial_batch_size: 40,
            search_batch_size: 50,
            max_visible: 15,
            chunk_size: 3,
            chunk_yield: Duration::from_millis(10),
            processing_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(5_000),
            viewport_buffer: 500.0,
            error_threshold: 5,
            error_window: Duration::from_secs(60),
            backoff_factor: 1.5,
            debounce: Duration::from_millis(250),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemma-3n-e4b-it".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            temperature: 0.2,
            max_output_tokens: 2048,
            timeout: Duration::from_secs(30),
        }
    }
}
