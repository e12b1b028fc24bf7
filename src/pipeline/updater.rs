use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{stream, FutureExt, StreamExt};
use log::debug;

use crate::generator::{
    encode_links, filter_by_keywords, proxy_to_clash, region_summary, resolve_nodes_reserving,
    ClashOptions,
};
use crate::models::ProxyNode;
use crate::parser::subparser::extract_from_body;
use crate::parser::{order_by_links, ParseCache, ParseOutcome, ParserPool};
use crate::settings::{CancellationPolicy, OutputSettings, RegionConfig, Settings};
use crate::utils::RegionMatcher;

use super::record::{
    LogEntry, LogLevel, PipelineState, RunLog, RunRecord, RunStatus, StatusReport,
};
use super::source::{FetchError, SourceConfig, SourceFetcher, SourceProvider};
use super::storage::ArtifactStore;
use super::PipelineError;

struct UpdaterState {
    phase: PipelineState,
    next_id: u64,
    current: Option<RunRecord>,
    last_run_at: Option<DateTime<Utc>>,
    last_status: Option<RunStatus>,
    log: RunLog,
    history: VecDeque<RunRecord>,
    history_capacity: usize,
}

impl UpdaterState {
    fn push_log(&mut self, level: LogLevel, message: String) {
        let entry = self.log.push(level, message);
        if let Some(current) = self.current.as_mut() {
            current.log.push(entry);
        }
    }

    fn archive(&mut self, record: RunRecord) {
        self.last_run_at = record.finished_at;
        self.last_status = record.status;
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Releases the running flag when a run ends, however it ends.
struct RunningGuard<'a> {
    state: &'a Mutex<UpdaterState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Only set when the run future was dropped before completing.
        if let Some(mut record) = state.current.take() {
            record.finish(RunStatus::Failed, Some("run aborted".to_string()));
            state.archive(record);
        }
        state.phase = PipelineState::Idle;
    }
}

/// Drives one fetch → parse → filter → dedupe → synthesize → persist run
/// at a time and keeps its status, message log and history.
///
/// Share it with `Arc`; all methods take `&self`.
pub struct ConfigUpdater<F, S> {
    sources: Box<dyn SourceProvider + Send + Sync>,
    fetcher: F,
    store: S,
    pool: Arc<ParserPool>,
    matcher: Arc<RegionMatcher>,
    clash: ClashOptions,
    output: OutputSettings,
    fetch_timeout: Duration,
    fetch_concurrency: usize,
    cancellation: CancellationPolicy,
    stop_requested: AtomicBool,
    state: Mutex<UpdaterState>,
}

impl<F, S> ConfigUpdater<F, S>
where
    F: SourceFetcher + Send + Sync,
    S: ArtifactStore + Send + Sync,
{
    pub fn new(
        sources: impl SourceProvider + Send + Sync + 'static,
        fetcher: F,
        store: S,
        settings: &Settings,
    ) -> Self {
        let cache = Arc::new(ParseCache::new(
            settings.parser.cache_ttl(),
            settings.parser.cache_sweep_threshold,
        ));
        let pool = Arc::new(ParserPool::new(settings.parser.workers, cache));
        let regions = RegionConfig::load_or_default(settings.region_config_path().as_deref());
        let history_capacity = settings.pipeline.history_capacity.max(1);

        Self {
            sources: Box::new(sources),
            fetcher,
            store,
            pool,
            matcher: Arc::new(RegionMatcher::from_config(&regions)),
            clash: settings.clash.clone(),
            output: settings.output.clone(),
            fetch_timeout: settings.fetch.timeout(),
            fetch_concurrency: settings.fetch.concurrency.max(1),
            cancellation: settings.pipeline.cancellation,
            stop_requested: AtomicBool::new(false),
            state: Mutex::new(UpdaterState {
                phase: PipelineState::Idle,
                next_id: 1,
                current: None,
                last_run_at: None,
                last_status: None,
                log: RunLog::new(settings.pipeline.log_capacity),
                history: VecDeque::with_capacity(history_capacity),
                history_capacity,
            }),
        }
    }

    pub fn with_region_matcher(mut self, matcher: Arc<RegionMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_parser_pool(mut self, pool: Arc<ParserPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn region_matcher(&self) -> &Arc<RegionMatcher> {
        &self.matcher
    }

    pub fn parser_pool(&self) -> &Arc<ParserPool> {
        &self.pool
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock_state(&self) -> MutexGuard<'_, UpdaterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.lock_state().push_log(level, message.into());
    }

    fn update_record(&self, f: impl FnOnce(&mut RunRecord)) {
        if let Some(record) = self.lock_state().current.as_mut() {
            f(record);
        }
    }

    fn begin(&self) -> Result<RunningGuard<'_>, PipelineError> {
        let mut state = self.lock_state();
        if state.phase == PipelineState::Running {
            // Global log only; the in-flight record stays untouched.
            state
                .log
                .push(LogLevel::Warning, "Update requested while a run is in progress");
            return Err(PipelineError::AlreadyRunning);
        }
        state.phase = PipelineState::Running;
        let id = state.next_id;
        state.next_id += 1;
        state.current = Some(RunRecord::new(id));
        self.stop_requested.store(false, Ordering::SeqCst);
        Ok(RunningGuard { state: &self.state })
    }

    fn checkpoint(&self) -> Result<(), PipelineError> {
        if self.cancellation == CancellationPolicy::Cooperative
            && self.stop_requested.load(Ordering::SeqCst)
        {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// Performs one complete run.
    ///
    /// Returns the finished record on success. A failed run is still
    /// recorded in the history before its error is returned. Fails with
    /// [`PipelineError::AlreadyRunning`] without touching the in-flight run
    /// when another run holds the flag.
    pub async fn run(&self) -> Result<RunRecord, PipelineError> {
        let _guard = self.begin()?;
        self.log(LogLevel::Info, "Starting config update run");

        let result = match AssertUnwindSafe(self.execute()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(PipelineError::Internal(panic_message(panic.as_ref()))),
        };

        let mut state = self.lock_state();
        let status = if result.is_ok() {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        if let Err(e) = &result {
            state.push_log(LogLevel::Error, format!("Run failed: {}", e));
        }
        let mut record = match state.current.take() {
            Some(record) => record,
            None => return Err(PipelineError::Internal("run record missing".to_string())),
        };
        record.finish(status, result.as_ref().err().map(ToString::to_string));
        state.archive(record.clone());
        drop(state);

        result.map(|()| record)
    }

    async fn execute(&self) -> Result<(), PipelineError> {
        let sources = self.sources.load_sources()?.normalized();
        if sources.urls.is_empty() {
            return Err(PipelineError::NoSourcesConfigured);
        }
        self.update_record(|r| r.counts.sources_total = sources.urls.len());
        self.log(
            LogLevel::Info,
            format!("Fetching {} sources", sources.urls.len()),
        );
        self.checkpoint()?;

        let bodies = self.fetch_all(&sources.urls).await;
        self.update_record(|r| r.counts.sources_fetched = bodies.len());
        self.checkpoint()?;

        let links = collect_links(&bodies);
        self.update_record(|r| r.counts.links_extracted = links.len());
        self.log(
            LogLevel::Info,
            format!(
                "Extracted {} links from {} sources",
                links.len(),
                bodies.len()
            ),
        );
        if links.is_empty() {
            return Err(PipelineError::NoValidNodes);
        }
        self.checkpoint()?;

        let outcomes = self.parse_links(links.clone()).await?;
        let (nodes, rejected) = split_outcomes(outcomes);
        self.update_record(|r| {
            r.counts.links_parsed = nodes.len();
            r.counts.links_rejected = rejected;
        });
        self.log(
            LogLevel::Info,
            format!("Parsed {} nodes, rejected {} links", nodes.len(), rejected),
        );
        self.checkpoint()?;

        let (nodes, removed) = filter_by_keywords(nodes, &sources.filter_keywords);
        let nodes = resolve_nodes_reserving(nodes, self.clash.reserved_names());
        self.update_record(|r| {
            r.counts.nodes_filtered = removed;
            r.counts.nodes_final = nodes.len();
        });
        if removed > 0 {
            self.log(
                LogLevel::Info,
                format!("Filtered out {} nodes by keyword", removed),
            );
        }
        if nodes.is_empty() {
            return Err(PipelineError::NoValidNodes);
        }

        let regions = region_summary(&nodes, &self.matcher);
        debug!("Region breakdown: {:?}", regions);
        self.update_record(|r| r.regions = regions);

        let document = proxy_to_clash(&nodes, &self.clash)?;
        self.checkpoint()?;

        self.persist(&self.output.v2ray_file, encode_links(&links))
            .await;
        self.persist(&self.output.clash_file, document).await;

        self.log(
            LogLevel::Success,
            format!(
                "Config update finished: {} links, {} final nodes",
                links.len(),
                nodes.len()
            ),
        );
        Ok(())
    }

    /// Fetches every source with bounded parallelism, in source order.
    /// Failed or timed-out sources are logged and left out.
    async fn fetch_all(&self, urls: &[String]) -> Vec<(String, String)> {
        let timeout = self.fetch_timeout;
        let results: Vec<(String, Result<String, FetchError>)> = stream::iter(urls.to_vec())
            .map(|url| async move {
                let result = match tokio::time::timeout(timeout, self.fetcher.fetch(&url)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                (url, result)
            })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut bodies = Vec::with_capacity(results.len());
        for (url, result) in results {
            match result {
                Ok(body) => bodies.push((url, body)),
                Err(e) => {
                    let err = PipelineError::FetchFailed {
                        url,
                        reason: e.to_string(),
                    };
                    self.log(LogLevel::Warning, err.to_string());
                }
            }
        }
        bodies
    }

    async fn parse_links(&self, links: Vec<String>) -> Result<Vec<ParseOutcome>, PipelineError> {
        parse_in_background(Arc::clone(&self.pool), links).await
    }

    async fn persist(&self, name: &str, content: String) {
        match self.store.put(name, content.into_bytes()).await {
            Ok(()) => self.log(LogLevel::Success, format!("Saved {}", name)),
            Err(source) => {
                let err = PipelineError::Storage {
                    name: name.to_string(),
                    source,
                };
                self.log(LogLevel::Error, err.to_string());
            }
        }
    }

    /// Asks the current run to stop. Under the deferred policy the request
    /// is only logged and cleared when the next run starts.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let message = match self.cancellation {
            CancellationPolicy::Deferred => "Stop requested; the current run will complete",
            CancellationPolicy::Cooperative => "Stop requested; the current run will be cancelled",
        };
        self.log(LogLevel::Info, message);
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().phase == PipelineState::Running
    }

    pub fn status(&self) -> StatusReport {
        let state = self.lock_state();
        StatusReport {
            is_running: state.phase == PipelineState::Running,
            state: state.phase,
            last_run_at: state.last_run_at,
            last_status: state.last_status,
        }
    }

    /// The most recent `limit` log messages, oldest first.
    pub fn logs(&self, limit: usize) -> Vec<LogEntry> {
        self.lock_state().log.recent(limit)
    }

    /// Finished runs, oldest first.
    pub fn history(&self) -> Vec<RunRecord> {
        self.lock_state().history.iter().cloned().collect()
    }

    pub fn last_record(&self) -> Option<RunRecord> {
        self.lock_state().history.back().cloned()
    }

    /// Snapshot of the run in flight, if any.
    pub fn current_record(&self) -> Option<RunRecord> {
        self.lock_state().current.clone()
    }

    /// Renders a document from already-parsed nodes. Does not touch run
    /// state or storage.
    pub fn render_nodes(&self, nodes: &[ProxyNode]) -> Result<String, PipelineError> {
        let nodes = resolve_nodes_reserving(nodes.to_vec(), self.clash.reserved_names());
        if nodes.is_empty() {
            return Err(PipelineError::NoValidNodes);
        }
        Ok(proxy_to_clash(&nodes, &self.clash)?)
    }

    /// Fetches and renders the given sources without touching run state or
    /// storage. Unlike a full run, a source that cannot be fetched is an
    /// error.
    pub async fn render_sources(
        &self,
        urls: &[String],
        filter_keywords: &[String],
    ) -> Result<String, PipelineError> {
        let sources = SourceConfig::new(urls.to_vec(), filter_keywords.to_vec()).normalized();
        if sources.urls.is_empty() {
            return Err(PipelineError::NoSourcesConfigured);
        }

        let mut bodies = Vec::with_capacity(sources.urls.len());
        for url in &sources.urls {
            let body = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url)).await
            {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    return Err(PipelineError::FetchFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    })
                }
                Err(_) => {
                    return Err(PipelineError::FetchFailed {
                        url: url.clone(),
                        reason: FetchError::Timeout(self.fetch_timeout).to_string(),
                    })
                }
            };
            bodies.push((url.clone(), body));
        }

        let links = collect_links(&bodies);
        let outcomes = parse_in_background(Arc::clone(&self.pool), links).await?;
        let (nodes, _) = split_outcomes(outcomes);
        let (nodes, _) = filter_by_keywords(nodes, &sources.filter_keywords);
        self.render_nodes(&nodes)
    }
}

async fn parse_in_background(
    pool: Arc<ParserPool>,
    links: Vec<String>,
) -> Result<Vec<ParseOutcome>, PipelineError> {
    tokio::task::spawn_blocking(move || {
        let outcomes = pool.parse_many(&links);
        order_by_links(&links, outcomes)
    })
    .await
    .map_err(|e| PipelineError::Worker(e.to_string()))
}

/// Scans every body for links, keeping the first occurrence of each link
/// across all sources.
fn collect_links(bodies: &[(String, String)]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for (url, body) in bodies {
        let found = extract_from_body(body);
        debug!("{} links found in {}", found.len(), url);
        for link in found {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }
    links
}

fn split_outcomes(outcomes: Vec<ParseOutcome>) -> (Vec<ProxyNode>, usize) {
    let mut nodes = Vec::with_capacity(outcomes.len());
    let mut rejected = 0;
    for outcome in outcomes {
        if let Some(text) = outcome.describe_error() {
            debug!("Rejected link: {}", text);
        }
        match outcome.node {
            Some(node) => nodes.push(node),
            None => rejected += 1,
        }
    }
    (nodes, rejected)
}

/// Renders a document straight from share links, with no fetching.
pub fn render_links(
    pool: &ParserPool,
    links: &[String],
    filter_keywords: &[String],
    options: &ClashOptions,
) -> Result<String, PipelineError> {
    let outcomes = order_by_links(links, pool.parse_many(links));
    let (nodes, _) = split_outcomes(outcomes);
    let (nodes, _) = filter_by_keywords(nodes, filter_keywords);
    let nodes = resolve_nodes_reserving(nodes, options.reserved_names());
    if nodes.is_empty() {
        return Err(PipelineError::NoValidNodes);
    }
    Ok(proxy_to_clash(&nodes, options)?)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("run panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("run panicked: {}", s)
    } else {
        "run panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{MemoryStore, StaticFetcher};

    const SS: &str = "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#HK-01";
    const TROJAN: &str = "trojan://pw@jp.example.com:443#JP-01";

    fn updater(fetcher: StaticFetcher, urls: &[&str]) -> ConfigUpdater<StaticFetcher, MemoryStore> {
        let config = SourceConfig::new(urls.iter().map(|u| u.to_string()).collect(), vec![]);
        ConfigUpdater::new(config, fetcher, MemoryStore::new(), &Settings::default())
    }

    #[test]
    fn test_collect_links_dedups_across_sources() {
        let bodies = vec![
            ("a".to_string(), format!("{}\n{}", SS, TROJAN)),
            ("b".to_string(), format!("{}\n", TROJAN)),
        ];
        assert_eq!(collect_links(&bodies), vec![SS, TROJAN]);
    }

    #[test]
    fn test_render_links() {
        let pool = ParserPool::default();
        let links = vec![SS.to_string(), "bogus://x".to_string()];
        let doc = render_links(&pool, &links, &[], &ClashOptions::default()).unwrap();
        assert!(doc.contains("HK-01"));

        let err = render_links(&pool, &links, &["HK".to_string()], &ClashOptions::default());
        assert!(matches!(err, Err(PipelineError::NoValidNodes)));
    }

    #[test]
    fn test_render_renames_group_named_nodes() {
        let pool = ParserPool::default();
        let links = vec![
            "trojan://pw@a.example.com:443#Auto".to_string(),
            "trojan://pw@b.example.com:443#REJECT".to_string(),
        ];
        let doc = render_links(&pool, &links, &[], &ClashOptions::default()).unwrap();
        assert!(doc.contains("name: Auto-1"));
        assert!(doc.contains("name: REJECT-1"));
    }

    #[tokio::test]
    async fn test_run_persists_both_artifacts() {
        let fetcher = StaticFetcher::new().with_body("https://a", format!("{}\n{}", SS, TROJAN));
        let updater = updater(fetcher, &["https://a"]);
        let record = updater.run().await.unwrap();

        assert_eq!(record.status, Some(RunStatus::Success));
        assert_eq!(record.counts.nodes_final, 2);
        assert_eq!(record.regions.values().sum::<usize>(), 2);
        let clash = updater.store().get_string("clash.yaml").unwrap();
        assert!(clash.contains("JP-01"));
        let xr = updater.store().get_string("xr").unwrap();
        assert_eq!(xr, encode_links(&[SS, TROJAN]));
        assert!(!updater.is_running());
    }

    #[tokio::test]
    async fn test_render_does_not_touch_state() {
        let fetcher = StaticFetcher::new().with_body("https://a", SS);
        let updater = updater(fetcher, &["https://a"]);
        let doc = updater
            .render_sources(&["https://a".to_string()], &[])
            .await
            .unwrap();
        assert!(doc.contains("HK-01"));
        assert!(updater.history().is_empty());
        assert!(updater.logs(10).is_empty());
        assert!(updater.store().is_empty());

        let err = updater
            .render_sources(&["https://missing".to_string()], &[])
            .await;
        assert!(matches!(err, Err(PipelineError::FetchFailed { .. })));
        assert!(matches!(
            updater.render_nodes(&[]),
            Err(PipelineError::NoValidNodes)
        ));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "run panicked: boom");
    }
}
