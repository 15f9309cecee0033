pub mod env;
mod loader;

pub use env::{
    AppConfig, DirectoryConfig, GeminiConfig, ListConfig, LoggingConfig, RelevanceConfig,
    ScanConfig, SchedulerConfig,
};
pub use loader::load_config;

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            relevance: RelevanceConfig::default(),
            scan: ScanConfig {
                chunk_yield: std::time::Duration::from_millis(0),
                ..ScanConfig::default()
            },
            lists: ListConfig {
                hidden_disables_matching: false,
            },
            directories: DirectoryConfig {
                logs_dir: "logs".to_string(),
                data_dir: "data".to_string(),
                db_filename: "focus-filter.db".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            scheduler: SchedulerConfig {
                reconcile_cron: "*/30 * * * * *".to_string(),
            },
        }
    }
}
