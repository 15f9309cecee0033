use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tokio_cron_scheduler::JobScheduler;

use crate::{
    ai::GeminiClient,
    config::AppConfig,
    db::{self, SettingsStore},
    domain::TaskSession,
    host::{spawn_writer, AppState, HostService},
    infrastructure::{
        diagnostics::Diagnostics,
        directories::ResolvedPaths,
        shutdown::{Shutdown, ShutdownReason},
    },
    keywords::KeywordStore,
    lists::{FilterLists, SharedLists},
    relevance::{RelevanceEngine, VideoEvaluator},
    tasks::{
        processor::{ScanProcessor, ScanSessions},
        scheduler::{configure_reconcile_job, run_reconcile},
    },
};

const CHANNEL_CAPACITY: usize = 64;

pub struct FocusFilterApp {
    _paths: ResolvedPaths,
    scheduler: JobScheduler,
    processor_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
    host: HostService,
    state: Arc<AppState>,
    shutdown: Shutdown,
}

impl FocusFilterApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = db::init_pool(&paths.db_path)
            .await
            .with_context(|| format!("failed to open {}", paths.db_path.display()))?;
        let settings = SettingsStore::new(pool);

        let http_client = Client::builder()
            .user_agent(format!("focus-filter/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let gemini = Arc::new(GeminiClient::new(http_client, config.gemini.clone()));
        let has_credential = gemini.has_credential();
        if !has_credential {
            tracing::warn!(target: "keywords", "GEMINI_API_KEY가 설정되지 않아 키워드 생성이 비활성화됩니다");
        }

        let session = Arc::new(TaskSession::default());
        let keywords = Arc::new(KeywordStore::new(gemini, settings.clone()));
        let lists = Arc::new(SharedLists::new(
            FilterLists::default(),
            config.lists.hidden_disables_matching,
        ));
        let diagnostics = Arc::new(Diagnostics::new(settings.clone()));
        let engine = Arc::new(RelevanceEngine::new(
            config.relevance.clone(),
            keywords.clone(),
            lists.clone(),
            diagnostics.clone(),
        ));

        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (scan_tx, scan_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let scans = Arc::new(ScanSessions::new(config.scan.clone()));

        let evaluator = Arc::new(VideoEvaluator::new(
            engine.clone(),
            session.clone(),
            diagnostics.clone(),
        ));
        let processor = Arc::new(ScanProcessor::new(
            scans.clone(),
            evaluator,
            session.clone(),
            outbound_tx.clone(),
            config.scan.clone(),
        ));
        let processor_handle = processor.spawn(scan_rx, shutdown.subscribe());

        let state = Arc::new(AppState {
            config: config.clone(),
            settings,
            session: session.clone(),
            keywords: keywords.clone(),
            lists,
            engine,
            diagnostics,
            scans,
            scan_events: scan_tx,
            has_credential,
        });
        state.load_essential_data().await;

        let scheduler =
            configure_reconcile_job(&config.scheduler.reconcile_cron, keywords, session).await?;

        let writer_handle = spawn_writer(tokio::io::stdout(), outbound_rx);
        let host = HostService::new(state.clone(), outbound_tx);

        Ok(Self {
            _paths: paths,
            scheduler,
            processor_handle,
            writer_handle,
            host,
            state,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let FocusFilterApp {
            _paths: _,
            mut scheduler,
            processor_handle,
            writer_handle,
            host,
            state,
            shutdown,
        } = self;

        tracing::info!("focus-filter 네이티브 호스트 시작");

        match host.run(tokio::io::stdin(), shutdown.subscribe()).await {
            Ok(()) => shutdown.trigger(ShutdownReason::BrowserDisconnected),
            Err(err) => {
                tracing::error!(target: "host", error = %err, "네이티브 메시징 파이프 오류로 종료합니다");
                shutdown.trigger(ShutdownReason::PipeFailure);
            }
        }
        drop(host);

        let shutdown_timeout = Duration::from_secs(5);

        match timeout(shutdown_timeout, scheduler.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(?err, "스케줄러 종료 실패");
            }
            Err(_) => {
                tracing::warn!(
                    target: "scheduler",
                    "스케줄러 종료가 {:?} 내에 완료되지 않았습니다.",
                    shutdown_timeout
                );
            }
        }

        join_or_abort("scan processor", processor_handle, shutdown_timeout).await;

        // last chance for keyword writes that failed while running
        run_reconcile(&state.keywords, &state.session).await;
        if timeout(shutdown_timeout, state.settings.close()).await.is_err() {
            tracing::warn!(
                target: "store",
                "저장소 정리가 {:?} 내에 완료되지 않았습니다.",
                shutdown_timeout
            );
        }
        drop(state);

        join_or_abort("outbound writer", writer_handle, shutdown_timeout).await;

        tracing::info!(reason = ?shutdown.reason(), "호스트 종료 완료");
        Ok(())
    }
}

async fn join_or_abort(name: &str, mut handle: JoinHandle<()>, limit: Duration) {
    let deadline = tokio::time::sleep(limit);
    tokio::pin!(deadline);
    tokio::select! {
        res = &mut handle => {
            if let Err(err) = res {
                if err.is_panic() {
                    tracing::error!(task = name, "작업이 패닉으로 종료되었습니다");
                }
            }
        }
        _ = &mut deadline => {
            tracing::warn!(
                task = name,
                "작업 종료가 {:?} 내에 완료되지 않아 중단합니다",
                limit
            );
            handle.abort();
        }
    }
}
