use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::KeywordSet;

pub mod parser;
pub mod store;

pub use parser::{parse_keywords, ParseStage};
pub use store::{KeywordLookup, KeywordOrigin, KeywordStore, ReconcileOutcome, Regenerated};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no task is set")]
    MissingTask,
    #[error("GEMINI_API_KEY must be configured for keyword generation")]
    MissingCredential,
    #[error("keyword service unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("keyword service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("keyword service response contained no usable keywords")]
    Unparsable { raw: String },
}

impl GenerationError {
    /// Configuration problems are reported to the caller and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingTask | Self::MissingCredential)
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Unparsable { raw } => Some(raw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedKeywords {
    pub keywords: KeywordSet,
    pub raw: String,
    pub stage: ParseStage,
}

/// Anything that can turn a task description into keywords.
pub trait KeywordSource: Send + Sync {
    fn generate<'a>(
        &'a self,
        task: &'a str,
    ) -> BoxFuture<'a, Result<GeneratedKeywords, GenerationError>>;
}
