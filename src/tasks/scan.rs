use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;

use crate::{
    config::ScanConfig,
    domain::{Directive, PageKind, PageSignal, QueueSnapshot, SignalSource, TaskStamp, VerdictSource},
    keywords::GenerationError,
};

use super::{
    backpressure::{RateController, RateStats},
    queue::{Lane, ScanQueue},
};

/// Why a scheduling pass was started. Later variants are stronger and win
/// when triggers are coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanTrigger {
    PeriodicTick,
    Mutation,
    ScrollStop,
    InitialLoad,
    Aggressive,
}

impl ScanTrigger {
    pub fn includes_offscreen(self) -> bool {
        matches!(self, Self::InitialLoad | Self::Aggressive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Relevant,
    Irrelevant,
    Overridden,
}

/// Elements without an entry are unseen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Queued,
    InFlight,
    Resolved(Resolution),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bounds {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub height: f64,
}

#[derive(Clone)]
pub struct Candidate {
    pub id: String,
    pub bounds: Bounds,
    pub source: Arc<dyn SignalSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementOutcome {
    pub is_relevant: bool,
    pub source: VerdictSource,
    /// Task generation that was current when evaluation started.
    pub stamp: TaskStamp,
    /// The keyword service failed and the decision was made without it.
    pub remote_failed: bool,
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("keyword lookup failed: {0}")]
    Keywords(#[from] GenerationError),
}

pub trait ElementEvaluator: Send + Sync {
    fn evaluate<'a>(
        &'a self,
        signal: PageSignal,
    ) -> BoxFuture<'a, Result<ElementOutcome, EvaluationError>>;

    fn is_current(&self, stamp: TaskStamp) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDirective {
    pub id: String,
    pub directive: Directive,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<VerdictSource>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCounters {
    pub relevant: u64,
    pub irrelevant: u64,
    pub overridden: u64,
    pub failed: u64,
    pub stale_discarded: u64,
    pub remote_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    #[serde(flatten)]
    pub counters: ScanCounters,
    pub queued: QueueSnapshot,
    pub in_flight: usize,
    pub rate: RateStats,
    pub epoch: u64,
}

struct QueuedElement {
    id: String,
    source: Arc<dyn SignalSource>,
}

struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Decides which candidate elements get evaluated, and when.
///
/// Each element moves `unseen -> queued -> in-flight -> resolved` and only
/// goes back to unseen through [`ScanScheduler::reset`]. Results that arrive
/// after a reset, or that were computed for an older task, are dropped.
pub struct ScanScheduler {
    config: ScanConfig,
    queue: ScanQueue<QueuedElement>,
    states: Mutex<HashMap<String, ElementState>>,
    rate: RateController,
    processing: AtomicBool,
    epoch: AtomicU64,
    counters: Mutex<ScanCounters>,
}

impl ScanScheduler {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            rate: RateController::new(&config),
            config,
            queue: ScanQueue::new(),
            states: Mutex::new(HashMap::new()),
            processing: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            counters: Mutex::new(ScanCounters::default()),
        }
    }

    /// Rebuilds the queue from the unresolved candidates and returns how many
    /// were queued. Visible elements come first; offscreen ones only ride
    /// along on initial or aggressive passes, up to the pass capacity.
    pub fn plan(
        &self,
        trigger: ScanTrigger,
        page: PageKind,
        candidates: Vec<Candidate>,
        viewport: Viewport,
    ) -> usize {
        let mut states = self.states.lock();
        for dropped in self.queue.clear() {
            if states.get(&dropped.id) == Some(&ElementState::Queued) {
                states.remove(&dropped.id);
            }
        }

        let mut seen = HashSet::new();
        let (visible, offscreen): (Vec<Candidate>, Vec<Candidate>) = candidates
            .into_iter()
            .filter(|candidate| !states.contains_key(&candidate.id))
            .filter(|candidate| seen.insert(candidate.id.clone()))
            .partition(|candidate| self.near_viewport(candidate.bounds, viewport));

        let mut queued = 0;
        for candidate in visible.into_iter().take(self.config.max_visible) {
            states.insert(candidate.id.clone(), ElementState::Queued);
            self.queue.push(Lane::Visible, queued_element(candidate));
            queued += 1;
        }
        let visible_count = queued;

        if trigger.includes_offscreen() {
            let remaining = self.capacity(trigger, page).saturating_sub(visible_count);
            for candidate in offscreen.into_iter().take(remaining) {
                states.insert(candidate.id.clone(), ElementState::Queued);
                self.queue.push(Lane::Offscreen, queued_element(candidate));
                queued += 1;
            }
        }

        if queued > 0 {
            tracing::debug!(
                target: "scan",
                trigger = ?trigger,
                visible = visible_count,
                offscreen = queued - visible_count,
                "queued elements"
            );
        }
        queued
    }

    /// Evaluates everything queued. Returns immediately with no directives
    /// when another drain is already running; that drain picks up whatever
    /// was queued in the meantime.
    pub async fn drain(&self, evaluator: &dyn ElementEvaluator) -> Vec<ElementDirective> {
        let mut directives = Vec::new();
        loop {
            if self.processing.swap(true, Ordering::AcqRel) {
                tracing::debug!(target: "scan", "drain already running");
                return directives;
            }
            {
                let _guard = ProcessingGuard(&self.processing);
                self.drain_queued(evaluator, &mut directives).await;
            }
            // a plan() that landed between the last check and the guard drop
            // would otherwise wait for the next trigger
            if self.queue.is_empty() {
                return directives;
            }
        }
    }

    async fn drain_queued(
        &self,
        evaluator: &dyn ElementEvaluator,
        directives: &mut Vec<ElementDirective>,
    ) {
        let chunk_size = self.config.chunk_size.max(1);

        loop {
            let epoch = self.epoch.load(Ordering::Acquire);
            let batch = self.start_batch(self.queue.take(self.rate.batch_size()));
            if batch.is_empty() {
                if self.queue.is_empty() {
                    return;
                }
                continue;
            }

            let chunk_count = batch.len().div_ceil(chunk_size);
            for (index, chunk) in batch.chunks(chunk_size).enumerate() {
                let results = join_all(
                    chunk
                        .iter()
                        .map(|element| evaluator.evaluate(element.source.extract_signal())),
                )
                .await;

                for (element, result) in chunk.iter().zip(results) {
                    if let Some(directive) = self.apply(epoch, evaluator, element, result) {
                        directives.push(directive);
                    }
                }

                if index + 1 < chunk_count && !self.config.chunk_yield.is_zero() {
                    sleep(self.config.chunk_yield).await;
                }
            }

            if self.queue.is_empty() {
                return;
            }
            sleep(self.rate.delay()).await;
        }
    }

    /// The user asked to see an element regardless of its verdict.
    pub fn override_element(&self, id: &str) -> ElementDirective {
        self.states
            .lock()
            .insert(id.to_string(), ElementState::Resolved(Resolution::Overridden));
        self.counters.lock().overridden += 1;
        tracing::info!(target: "scan", element = %id, "element overridden by user");
        ElementDirective {
            id: id.to_string(),
            directive: Directive::Reveal,
            source: None,
        }
    }

    /// Forgets every element so the next pass evaluates them again. Results
    /// still in flight are discarded when they arrive.
    pub fn reset(&self) -> usize {
        let mut states = self.states.lock();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.queue.clear();
        let forgotten = states.len();
        states.clear();
        forgotten
    }

    #[cfg(test)]
    pub fn state(&self, id: &str) -> Option<ElementState> {
        self.states.lock().get(id).copied()
    }

    pub fn stats(&self) -> ScanStats {
        let in_flight = self
            .states
            .lock()
            .values()
            .filter(|state| **state == ElementState::InFlight)
            .count();
        ScanStats {
            counters: *self.counters.lock(),
            queued: self.queue.snapshot(),
            in_flight,
            rate: self.rate.stats(),
            epoch: self.epoch.load(Ordering::Acquire),
        }
    }

    fn capacity(&self, trigger: ScanTrigger, page: PageKind) -> usize {
        match (trigger, page) {
            (ScanTrigger::InitialLoad, _) => self.config.initial_batch_size,
            (ScanTrigger::Aggressive, PageKind::Search) => self.config.search_batch_size,
            _ => self.rate.batch_size(),
        }
    }

    fn near_viewport(&self, bounds: Bounds, viewport: Viewport) -> bool {
        let buffer = self.config.viewport_buffer;
        bounds.top < viewport.height + buffer && bounds.bottom > -buffer
    }

    /// Keeps only elements that are still queued and marks them in flight.
    fn start_batch(&self, batch: Vec<QueuedElement>) -> Vec<QueuedElement> {
        let mut states = self.states.lock();
        batch
            .into_iter()
            .filter(|element| {
                let queued = states.get(&element.id) == Some(&ElementState::Queued);
                if queued {
                    states.insert(element.id.clone(), ElementState::InFlight);
                }
                queued
            })
            .collect()
    }

    fn apply(
        &self,
        epoch: u64,
        evaluator: &dyn ElementEvaluator,
        element: &QueuedElement,
        result: Result<ElementOutcome, EvaluationError>,
    ) -> Option<ElementDirective> {
        let mut states = self.states.lock();
        let mut counters = self.counters.lock();

        if self.epoch.load(Ordering::Acquire) != epoch {
            counters.stale_discarded += 1;
            return None;
        }
        if states.get(&element.id) != Some(&ElementState::InFlight) {
            // overridden while the evaluation was running
            return None;
        }

        match result {
            Ok(outcome) => {
                if outcome.remote_failed {
                    counters.remote_failures += 1;
                    self.rate.record_error();
                }
                if !evaluator.is_current(outcome.stamp) {
                    states.remove(&element.id);
                    counters.stale_discarded += 1;
                    tracing::debug!(target: "scan", element = %element.id, "dropped verdict for previous task");
                    return None;
                }

                let resolution = if outcome.is_relevant {
                    counters.relevant += 1;
                    Resolution::Relevant
                } else {
                    counters.irrelevant += 1;
                    Resolution::Irrelevant
                };
                states.insert(element.id.clone(), ElementState::Resolved(resolution));
                Some(ElementDirective {
                    id: element.id.clone(),
                    directive: Directive::for_element(outcome.is_relevant),
                    source: Some(outcome.source),
                })
            }
            Err(err) => {
                tracing::warn!(target: "scan", element = %element.id, error = %err, "evaluation failed, showing element");
                counters.failed += 1;
                states.insert(
                    element.id.clone(),
                    ElementState::Resolved(Resolution::Relevant),
                );
                Some(ElementDirective {
                    id: element.id.clone(),
                    directive: Directive::Reveal,
                    source: None,
                })
            }
        }
    }
}

fn queued_element(candidate: Candidate) -> QueuedElement {
    QueuedElement {
        id: candidate.id,
        source: candidate.source,
    }
}
