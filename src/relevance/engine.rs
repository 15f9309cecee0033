use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    config::RelevanceConfig,
    domain::{KeywordSet, PageSignal, RelevanceVerdict, TaskSession, TaskStamp, VerdictSource},
    infrastructure::diagnostics::Diagnostics,
    keywords::{GenerationError, KeywordStore},
    lists::{ListKind, ListMatch, SharedLists},
    tasks::scan::{ElementEvaluator, ElementOutcome, EvaluationError},
};

use super::{LocalHeuristicClassifier, RelevanceScorer};

#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub verdict: RelevanceVerdict,
    /// Blacklist or mixed-use hit, reported alongside the keyword score.
    pub list_match: Option<ListMatch>,
    pub keyword_error: Option<String>,
}

/// Full-page relevance: list check first, then weighted keyword scoring.
pub struct RelevanceEngine {
    scorer: RelevanceScorer,
    classifier: LocalHeuristicClassifier,
    keywords: Arc<KeywordStore>,
    lists: Arc<SharedLists>,
    diagnostics: Arc<Diagnostics>,
}

impl RelevanceEngine {
    pub fn new(
        config: RelevanceConfig,
        keywords: Arc<KeywordStore>,
        lists: Arc<SharedLists>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            classifier: LocalHeuristicClassifier::new(config.large_keyword_set_size),
            scorer: RelevanceScorer::new(config),
            keywords,
            lists,
            diagnostics,
        }
    }

    /// Only configuration problems (no task, no credential) are returned as
    /// errors. A failing keyword service degrades to the fail-open verdict.
    pub async fn check_page(
        &self,
        task: &str,
        signal: &PageSignal,
    ) -> Result<PageOutcome, GenerationError> {
        let filter = self.lists.filter();
        if let Some(found) = filter.find(&signal.url, ListKind::Whitelist) {
            tracing::info!(
                target: "lists",
                domain = %signal.domain,
                pattern = %found.pattern,
                "[RELEVANT] whitelisted domain"
            );
            return Ok(PageOutcome {
                verdict: RelevanceVerdict::whitelisted(),
                list_match: Some(found),
                keyword_error: None,
            });
        }
        let list_match = filter.classify(&signal.url);

        match self.keywords.get_or_generate(task).await {
            Ok(lookup) => Ok(PageOutcome {
                verdict: self.scorer.score(signal, &lookup.keywords),
                list_match,
                keyword_error: None,
            }),
            Err(err) if err.is_configuration() => Err(err),
            Err(err) => {
                self.diagnostics
                    .record("keyword generation failed", Some(err.to_string()))
                    .await;
                Ok(PageOutcome {
                    verdict: RelevanceVerdict::fail_open(),
                    list_match,
                    keyword_error: Some(err.to_string()),
                })
            }
        }
    }

    pub fn classifier(&self) -> &LocalHeuristicClassifier {
        &self.classifier
    }

    pub fn keywords(&self) -> &Arc<KeywordStore> {
        &self.keywords
    }
}

/// Scores video and short cards for the scan scheduler.
///
/// Cards are judged by the local heuristics only. When the keyword service
/// fails the classifier runs with an empty set, which leans towards hiding.
pub struct VideoEvaluator {
    engine: Arc<RelevanceEngine>,
    session: Arc<TaskSession>,
    diagnostics: Arc<Diagnostics>,
}

impl VideoEvaluator {
    pub fn new(
        engine: Arc<RelevanceEngine>,
        session: Arc<TaskSession>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            engine,
            session,
            diagnostics,
        }
    }

    async fn evaluate_signal(&self, signal: PageSignal) -> Result<ElementOutcome, EvaluationError> {
        let (task, stamp) = self.session.current();

        let (keywords, remote_failed) = match self.engine.keywords().get_or_generate(&task).await {
            Ok(lookup) => (lookup.keywords, false),
            Err(err) if err.is_configuration() => {
                self.diagnostics
                    .record("video check skipped", Some(err.to_string()))
                    .await;
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!(target: "scan", error = %err, "judging video without keywords");
                (Arc::new(KeywordSet::default()), true)
            }
        };

        let decision =
            self.engine
                .classifier()
                .classify(&signal.title, &task, &signal.body_text, &keywords);
        tracing::debug!(
            target: "relevance",
            title = %signal.title,
            channel = signal.channel.as_deref().unwrap_or(""),
            rule = ?decision.rule,
            relevant = decision.is_relevant,
            "local video decision"
        );

        Ok(ElementOutcome {
            is_relevant: decision.is_relevant,
            source: VerdictSource::LocalHeuristic,
            stamp,
            remote_failed,
        })
    }
}

impl ElementEvaluator for VideoEvaluator {
    fn evaluate<'a>(
        &'a self,
        signal: PageSignal,
    ) -> BoxFuture<'a, Result<ElementOutcome, EvaluationError>> {
        Box::pin(self.evaluate_signal(signal))
    }

    fn is_current(&self, stamp: TaskStamp) -> bool {
        self.session.is_current(stamp)
    }
}
