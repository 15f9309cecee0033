use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::{
    config::ScanConfig,
    domain::{Directive, PageKind, TaskSession},
    infrastructure::shutdown::ShutdownListener,
};

use super::scan::{
    Candidate, ElementDirective, ElementEvaluator, ScanScheduler, ScanStats, ScanTrigger, Viewport,
};

/// One "candidate set changed" notification from a content page.
pub struct ScanEvent {
    pub session_id: String,
    pub page_url: String,
    pub trigger: ScanTrigger,
    pub viewport: Viewport,
    pub candidates: Vec<Candidate>,
}

/// One scheduler per open page, keyed by the session id the page picked.
pub struct ScanSessions {
    config: ScanConfig,
    sessions: Mutex<HashMap<String, Arc<ScanScheduler>>>,
}

impl ScanSessions {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, session_id: &str) -> Arc<ScanScheduler> {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(ScanScheduler::new(self.config.clone())))
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<ScanScheduler>> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn reset(&self, session_id: &str) -> Option<usize> {
        self.get(session_id).map(|scheduler| scheduler.reset())
    }

    /// Called when the task or a filter preference changes.
    pub fn reset_all(&self) -> usize {
        let schedulers: Vec<_> = self.sessions.lock().values().cloned().collect();
        for scheduler in &schedulers {
            scheduler.reset();
        }
        schedulers.len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, ScanStats> {
        self.sessions
            .lock()
            .iter()
            .map(|(id, scheduler)| (id.clone(), scheduler.stats()))
            .collect()
    }
}

struct PendingScan {
    page_url: String,
    trigger: ScanTrigger,
    viewport: Viewport,
    candidates: Vec<Candidate>,
    deadline: Instant,
}

/// Debounces scan events per session and runs the resulting passes.
///
/// The first event of a burst fixes the deadline; later events replace the
/// candidate list and can only strengthen the trigger. Directives go out as
/// unsolicited `scanDirectives` frames.
pub struct ScanProcessor {
    sessions: Arc<ScanSessions>,
    evaluator: Arc<dyn ElementEvaluator>,
    task_session: Arc<TaskSession>,
    outbound: mpsc::Sender<Value>,
    config: ScanConfig,
}

impl ScanProcessor {
    pub fn new(
        sessions: Arc<ScanSessions>,
        evaluator: Arc<dyn ElementEvaluator>,
        task_session: Arc<TaskSession>,
        outbound: mpsc::Sender<Value>,
        config: ScanConfig,
    ) -> Self {
        Self {
            sessions,
            evaluator,
            task_session,
            outbound,
            config,
        }
    }

    pub fn spawn(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ScanEvent>,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.run_loop(&mut events, &mut shutdown).await {
                tracing::error!(target: "scan", error = %err, "scan processor crashed");
            }
        })
    }

    async fn run_loop(
        &self,
        events: &mut mpsc::Receiver<ScanEvent>,
        shutdown: &mut ShutdownListener,
    ) -> Result<()> {
        let mut pending: HashMap<String, PendingScan> = HashMap::new();
        loop {
            if shutdown.is_triggered() {
                break;
            }

            let next_deadline = pending.values().map(|scan| scan.deadline).min();
            tokio::select! {
                _ = shutdown.notified() => break,
                event = events.recv() => match event {
                    Some(event) => self.coalesce(&mut pending, event),
                    None => break,
                },
                _ = wait_until(next_deadline) => {
                    let now = Instant::now();
                    let due: Vec<String> = pending
                        .iter()
                        .filter(|(_, scan)| scan.deadline <= now)
                        .map(|(id, _)| id.clone())
                        .collect();
                    for session_id in due {
                        if let Some(scan) = pending.remove(&session_id) {
                            self.dispatch(session_id, scan);
                        }
                    }
                }
            }
        }
        tracing::info!(target: "scan", dropped = pending.len(), "scan processor stopped");
        Ok(())
    }

    fn coalesce(&self, pending: &mut HashMap<String, PendingScan>, event: ScanEvent) {
        match pending.get_mut(&event.session_id) {
            Some(scan) => {
                scan.trigger = scan.trigger.max(event.trigger);
                scan.page_url = event.page_url;
                scan.viewport = event.viewport;
                scan.candidates = event.candidates;
            }
            None => {
                pending.insert(
                    event.session_id,
                    PendingScan {
                        page_url: event.page_url,
                        trigger: event.trigger,
                        viewport: event.viewport,
                        candidates: event.candidates,
                        deadline: Instant::now() + self.config.debounce,
                    },
                );
            }
        }
    }

    fn dispatch(&self, session_id: String, scan: PendingScan) {
        let scheduler = self.sessions.get_or_create(&session_id);
        let evaluator = self.evaluator.clone();
        let task_session = self.task_session.clone();
        let outbound = self.outbound.clone();

        tokio::spawn(async move {
            let directives = run_pass(&scheduler, evaluator.as_ref(), &task_session, scan).await;
            if directives.is_empty() {
                return;
            }
            let frame = json!({
                "event": "scanDirectives",
                "sessionId": session_id,
                "directives": directives,
                "pending": scheduler.stats().queued,
            });
            if outbound.send(frame).await.is_err() {
                tracing::debug!(target: "scan", session = %session_id, "outbound channel closed");
            }
        });
    }
}

async fn run_pass(
    scheduler: &ScanScheduler,
    evaluator: &dyn ElementEvaluator,
    task_session: &TaskSession,
    scan: PendingScan,
) -> Vec<ElementDirective> {
    let page = PageKind::from_url(&scan.page_url);
    let disabled = page
        .filter()
        .is_some_and(|filter| !task_session.filter_enabled(filter));

    if disabled || task_session.task().is_empty() {
        tracing::debug!(
            target: "scan",
            page = ?page,
            disabled,
            candidates = scan.candidates.len(),
            "filtering off; revealing candidates"
        );
        return scan
            .candidates
            .iter()
            .map(|candidate| ElementDirective {
                id: candidate.id.clone(),
                directive: Directive::Reveal,
                source: None,
            })
            .collect();
    }

    let queued = scheduler.plan(scan.trigger, page, scan.candidates, scan.viewport);
    if queued == 0 {
        return Vec::new();
    }
    scheduler.drain(evaluator).await
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
