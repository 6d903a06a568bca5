//! Runtime catalog: a periodically refreshed snapshot of the engine's languages and versions.
//!
//! Readers take a cheap `Arc` clone of the current [`CatalogSnapshot`] and never block on a
//! refresh. A refresh builds a complete new snapshot and swaps it in; a failed refresh
//! republishes the previous entries marked `stale`.

use crate::error::{CatalogError, EngineError};
use crate::version::compare_versions_desc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// One `(language, version)` runtime reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Engine-side runtime name (e.g. `node`, `deno`) when it differs from the language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

/// Where runtime listings come from.
#[async_trait]
pub trait RuntimeSource: Send + Sync {
    async fn fetch_runtimes(&self) -> Result<Vec<RuntimeVersion>, EngineError>;
}

/// Lowercased, trimmed language or alias key.
#[must_use]
pub fn normalize_language(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Immutable point-in-time view of all runtimes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    /// Language → versions, highest first.
    pub entries: BTreeMap<String, Vec<RuntimeVersion>>,
    /// Alias → language.
    pub aliases: BTreeMap<String, String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub generation: u64,
}

impl CatalogSnapshot {
    /// Build a snapshot from a raw engine listing.
    ///
    /// Languages and aliases are normalized; a version listed twice for one language keeps the
    /// first entry with the union of both alias sets.
    #[must_use]
    pub fn build(runtimes: Vec<RuntimeVersion>, fetched_at: DateTime<Utc>, generation: u64) -> Self {
        let mut entries: BTreeMap<String, Vec<RuntimeVersion>> = BTreeMap::new();

        for mut rt in runtimes {
            rt.language = normalize_language(&rt.language);
            rt.version = rt.version.trim().to_string();
            if rt.language.is_empty() || rt.version.is_empty() {
                tracing::warn!(language = %rt.language, version = %rt.version, "skipping incomplete runtime entry");
                continue;
            }
            rt.aliases = rt
                .aliases
                .iter()
                .map(|a| normalize_language(a))
                .filter(|a| !a.is_empty() && *a != rt.language)
                .collect();

            let versions = entries.entry(rt.language.clone()).or_default();
            if let Some(existing) = versions.iter_mut().find(|v| v.version == rt.version) {
                tracing::warn!(
                    language = %rt.language,
                    version = %rt.version,
                    "engine reported duplicate runtime; keeping the first"
                );
                existing.aliases.extend(rt.aliases);
                continue;
            }
            versions.push(rt);
        }

        for versions in entries.values_mut() {
            versions.sort_by(|a, b| compare_versions_desc(&a.version, &b.version));
        }

        let mut aliases: BTreeMap<String, String> = BTreeMap::new();
        for (language, versions) in &entries {
            for alias in versions.iter().flat_map(|v| v.aliases.iter()) {
                if entries.contains_key(alias) {
                    continue;
                }
                match aliases.get(alias) {
                    Some(owner) if owner != language => {
                        tracing::warn!(alias = %alias, language = %language, owner = %owner, "alias claimed by two languages; keeping the first");
                    }
                    Some(_) => {}
                    None => {
                        aliases.insert(alias.clone(), language.clone());
                    }
                }
            }
        }

        Self {
            entries,
            aliases,
            fetched_at: Some(fetched_at),
            stale: false,
            generation,
        }
    }

    /// True once at least one listing has been fetched successfully.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// Canonical language name for a language or alias, case-insensitively.
    #[must_use]
    pub fn canonical_language(&self, name: &str) -> Option<&str> {
        let key = normalize_language(name);
        if let Some((lang, _)) = self.entries.get_key_value(&key) {
            return Some(lang.as_str());
        }
        self.aliases.get(&key).map(String::as_str)
    }

    /// Versions of `language` (or an alias of it), highest first; empty if unknown.
    #[must_use]
    pub fn versions(&self, language: &str) -> &[RuntimeVersion] {
        self.canonical_language(language)
            .and_then(|lang| self.entries.get(lang))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn runtime_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

struct Inner {
    source: Arc<dyn RuntimeSource>,
    current: RwLock<Arc<CatalogSnapshot>>,
    // Serializes fetches so concurrent first callers share one request.
    fetch_lock: tokio::sync::Mutex<()>,
}

/// Shared handle to the runtime catalog.
#[derive(Clone)]
pub struct RuntimeCatalog {
    inner: Arc<Inner>,
}

impl RuntimeCatalog {
    #[must_use]
    pub fn new(source: Arc<dyn RuntimeSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                current: RwLock::new(Arc::new(CatalogSnapshot::default())),
                fetch_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Current snapshot; use one snapshot for multi-step reads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner.current.read().clone()
    }

    /// Versions of `language`, highest first; empty for an unknown language.
    #[must_use]
    pub fn get(&self, language: &str) -> Vec<RuntimeVersion> {
        self.snapshot().versions(language).to_vec()
    }

    /// Fetch the runtime listing and publish a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the listing cannot be fetched. The previous entries
    /// stay visible, marked stale.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let _guard = self.inner.fetch_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let prev = self.snapshot();
        match self.inner.source.fetch_runtimes().await {
            Ok(runtimes) => {
                let next = Arc::new(CatalogSnapshot::build(
                    runtimes,
                    Utc::now(),
                    prev.generation + 1,
                ));
                tracing::info!(
                    languages = next.entries.len(),
                    runtimes = next.runtime_count(),
                    generation = next.generation,
                    "runtime catalog refreshed"
                );
                *self.inner.current.write() = next.clone();
                Ok(next)
            }
            Err(e) => {
                tracing::warn!(error = %e, populated = prev.is_populated(), "runtime catalog refresh failed");
                if prev.is_populated() && !prev.stale {
                    let mut stale = (*prev).clone();
                    stale.stale = true;
                    *self.inner.current.write() = Arc::new(stale);
                }
                Err(CatalogError::Fetch(e))
            }
        }
    }

    /// Return a populated snapshot, fetching it first if the catalog has never been filled.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::StartupTimeout`] if the initial fetch does not finish within
    /// `startup_timeout`, or [`CatalogError::Fetch`] if it fails.
    pub async fn ensure_ready(
        &self,
        startup_timeout: Duration,
    ) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let current = self.snapshot();
        if current.is_populated() {
            return Ok(current);
        }

        let wait = async {
            let _guard = self.inner.fetch_lock.lock().await;
            let current = self.snapshot();
            if current.is_populated() {
                return Ok(current);
            }
            self.refresh_locked().await
        };
        match tokio::time::timeout(startup_timeout, wait).await {
            Ok(res) => res,
            Err(_) => Err(CatalogError::StartupTimeout {
                timeout_ms: u64::try_from(startup_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Refresh immediately and then every `interval` until `shutdown` is cancelled.
    pub fn spawn_refresh_loop(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let catalog = self.clone();
        let interval = interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("runtime catalog refresh loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Failures are logged by `refresh`; the next tick retries.
                        let _ = catalog.refresh().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{CatalogSnapshot, RuntimeCatalog, RuntimeSource, RuntimeVersion};
    use crate::error::{CatalogError, EngineError};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    pub(crate) fn rt(language: &str, version: &str, aliases: &[&str]) -> RuntimeVersion {
        RuntimeVersion {
            language: language.to_string(),
            version: version.to_string(),
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
            runtime: None,
        }
    }

    /// Replays scripted listings; the last one repeats.
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Result<Vec<RuntimeVersion>, EngineError>>>,
        delay: Duration,
        pub(crate) fetches: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(
            script: Vec<Result<Vec<RuntimeVersion>, EngineError>>,
            delay: Duration,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                delay,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RuntimeSource for ScriptedSource {
        async fn fetch_runtimes(&self) -> Result<Vec<RuntimeVersion>, EngineError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front().unwrap_or(Ok(Vec::new()))
            } else {
                script.front().cloned().unwrap_or(Ok(Vec::new()))
            }
        }
    }

    #[test]
    fn build_normalizes_dedupes_and_sorts() {
        let snap = CatalogSnapshot::build(
            vec![
                rt("Python", "3.10.9", &["py"]),
                rt("python", "3.11.2", &[]),
                rt("python ", "3.10.9", &["Python3"]),
                rt("python", "2.7.18", &[]),
                rt("javascript", "18.15.0", &["node-js", "JS"]),
            ],
            Utc::now(),
            1,
        );

        let versions: Vec<&str> = snap
            .versions("python")
            .iter()
            .map(|v| v.version.as_str())
            .collect();
        assert_eq!(versions, vec!["3.11.2", "3.10.9", "2.7.18"]);

        let merged = &snap.versions("python")[1];
        assert!(merged.aliases.contains("py"));
        assert!(merged.aliases.contains("python3"));

        assert_eq!(snap.canonical_language(" PY "), Some("python"));
        assert_eq!(snap.canonical_language("js"), Some("javascript"));
        assert!(snap.versions("cobol").is_empty());
        assert_eq!(snap.runtime_count(), 4);
        assert!(snap.is_populated());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_entries_and_marks_stale() {
        let source = ScriptedSource::new(
            vec![
                Ok(vec![rt("python", "3.11.2", &[])]),
                Err(EngineError::Transport("connection refused".into())),
            ],
            Duration::ZERO,
        );
        let catalog = RuntimeCatalog::new(source);

        let first = catalog.refresh().await.expect("first refresh");
        assert!(!first.stale);

        let err = catalog.refresh().await.expect_err("second refresh fails");
        assert!(matches!(err, CatalogError::Fetch(_)));

        let snap = catalog.snapshot();
        assert!(snap.stale);
        assert_eq!(snap.entries, first.entries);
        assert_eq!(catalog.get("python").len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_on_empty_catalog_stays_unpopulated() {
        let source = ScriptedSource::new(
            vec![Err(EngineError::Transport("down".into()))],
            Duration::ZERO,
        );
        let catalog = RuntimeCatalog::new(source);
        assert!(catalog.refresh().await.is_err());
        assert!(!catalog.snapshot().is_populated());

        let err = catalog
            .ensure_ready(Duration::from_secs(1))
            .await
            .expect_err("must fail");
        assert!(matches!(err, CatalogError::Fetch(_)));
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_fetch() {
        let source = ScriptedSource::new(
            vec![Ok(vec![rt("python", "3.11.2", &[])])],
            Duration::from_millis(100),
        );
        let catalog = RuntimeCatalog::new(source.clone());

        let (a, b, c) = tokio::join!(
            catalog.ensure_ready(Duration::from_secs(5)),
            catalog.ensure_ready(Duration::from_secs(5)),
            catalog.ensure_ready(Duration::from_secs(5)),
        );
        for snap in [a, b, c] {
            assert_eq!(snap.expect("ready").versions("python").len(), 1);
        }
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_ready_times_out() {
        let source = ScriptedSource::new(
            vec![Ok(vec![rt("python", "3.11.2", &[])])],
            Duration::from_secs(10),
        );
        let catalog = RuntimeCatalog::new(source);
        let err = catalog
            .ensure_ready(Duration::from_millis(50))
            .await
            .expect_err("must time out");
        assert_eq!(err, CatalogError::StartupTimeout { timeout_ms: 50 });
    }

    #[tokio::test]
    async fn refresh_loop_fetches_immediately_and_stops_on_cancel() {
        let source = ScriptedSource::new(
            vec![Ok(vec![rt("python", "3.11.2", &[])])],
            Duration::ZERO,
        );
        let catalog = RuntimeCatalog::new(source.clone());
        let shutdown = CancellationToken::new();
        let handle = catalog.spawn_refresh_loop(Duration::from_secs(3600), shutdown.clone());

        let start = std::time::Instant::now();
        while !catalog.snapshot().is_populated() {
            assert!(start.elapsed() < Duration::from_secs(5), "first tick never ran");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .expect("loop task");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_loop_picks_up_new_engine_listing() {
        let engine = toolhub_test_support::FakeEngine::start(serde_json::json!([
            {"language": "python", "version": "3.11.2"}
        ]))
        .await
        .expect("engine");
        let client = crate::engine::EngineClient::new(
            url::Url::parse(engine.base_url()).expect("url"),
            Duration::from_secs(5),
        )
        .expect("client");
        let catalog = RuntimeCatalog::new(Arc::new(client));
        let shutdown = CancellationToken::new();
        let handle = catalog.spawn_refresh_loop(Duration::from_secs(1), shutdown.clone());

        let start = std::time::Instant::now();
        while !catalog.snapshot().is_populated() {
            assert!(start.elapsed() < Duration::from_secs(5), "first tick never ran");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        engine.set_runtimes(serde_json::json!([
            {"language": "python", "version": "3.11.2"},
            {"language": "python", "version": "3.12.0"}
        ]));

        loop {
            let snapshot = catalog.snapshot();
            if snapshot.versions("python").len() == 2 {
                assert_eq!(snapshot.versions("python")[0].version, "3.12.0");
                assert!(snapshot.generation >= 2);
                assert!(!snapshot.stale);
                break;
            }
            assert!(start.elapsed() < Duration::from_secs(10), "new listing never published");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .expect("loop task");
        assert!(engine.listing_calls() >= 2);
    }
}
