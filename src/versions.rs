use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use log::{debug, info, warn};

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::providers::VersionStore;

/// Last known version of a pipeline and when it last changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCacheEntry {
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

impl VersionCacheEntry {
    /// An entry that can never count as new.
    fn baseline(version: String) -> Self {
        Self {
            version,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Annotates pipelines with their deployed version and a decaying "new" flag.
///
/// Versions are only fetched for pipelines that finished since the last poll
/// or have never been looked up; everything else is answered from the cache.
pub struct VersionFreshnessCache {
    store: Arc<dyn VersionStore>,
    enabled: bool,
    notify_window: TimeDelta,
    entries: HashMap<String, VersionCacheEntry>,
}

impl VersionFreshnessCache {
    pub fn new(store: Arc<dyn VersionStore>, enabled: bool, notify_window: TimeDelta) -> Self {
        Self {
            store,
            enabled,
            notify_window,
            entries: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn entry(&self, pipeline: &str) -> Option<&VersionCacheEntry> {
        self.entries.get(pipeline)
    }

    pub async fn annotate(&mut self, pipelines: &mut [Pipeline]) {
        self.annotate_at(pipelines, Utc::now()).await;
    }

    pub async fn annotate_at(&mut self, pipelines: &mut [Pipeline], now: DateTime<Utc>) {
        if !self.enabled {
            return;
        }

        let mut to_fetch = Vec::new();
        for pipeline in pipelines.iter_mut() {
            if pipeline.paused {
                continue;
            }
            if !pipeline.finished_recently {
                if let Some(entry) = self.entries.get(&pipeline.name) {
                    pipeline.build_version.clone_from(&entry.version);
                    pipeline.new_version = is_still_new(entry, now, self.notify_window);
                    continue;
                }
            }
            to_fetch.push(pipeline.name.clone());
        }

        if to_fetch.is_empty() {
            debug!("All pipeline versions answered from cache");
            return;
        }

        let store = self.store.as_ref();
        let mut fetched: HashMap<String, Result<String>> =
            join_all(to_fetch.into_iter().map(|name| async move {
                let version = store.get_version(&name).await.map(|body| decode(&body));
                (name, version)
            }))
            .await
            .into_iter()
            .collect();

        for pipeline in pipelines.iter_mut() {
            if let Some(version) = fetched.remove(&pipeline.name) {
                self.record(pipeline, version, now);
            }
        }
    }

    fn record(&mut self, pipeline: &mut Pipeline, fetched: Result<String>, now: DateTime<Utc>) {
        let version = match fetched {
            Ok(version) => version,
            Err(e) => {
                warn!("Failed to get version for {}: {e}", pipeline.name);
                // An empty baseline never matches a real version, so the next
                // successful fetch is reported as new.
                pipeline.build_version.clear();
                pipeline.new_version = false;
                self.entries.insert(
                    pipeline.name.clone(),
                    VersionCacheEntry::baseline(String::new()),
                );
                return;
            }
        };

        info!("Fetched version {version} for {}", pipeline.name);
        pipeline.build_version.clone_from(&version);

        let notify_window = self.notify_window;
        match self.entries.get_mut(&pipeline.name) {
            None => {
                info!("First version recorded for pipeline {}", pipeline.name);
                self.entries
                    .insert(pipeline.name.clone(), VersionCacheEntry::baseline(version));
                pipeline.new_version = false;
            }
            Some(entry) if entry.version != version => {
                info!("New version {version} of pipeline {}", pipeline.name);
                entry.version = version;
                entry.updated_at = now;
                pipeline.new_version = true;
            }
            Some(entry) => {
                pipeline.new_version = is_still_new(entry, now, notify_window);
            }
        }
    }

}

/// A version stops being new at exactly `updated_at + notify_window`.
fn is_still_new(entry: &VersionCacheEntry, now: DateTime<Utc>, notify_window: TimeDelta) -> bool {
    now - entry.updated_at < notify_window
}

fn decode(body: &[u8]) -> String {
    String::from_utf8_lossy(body).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVersionStore;

    const WINDOW_MINUTES: i64 = 15;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn minutes(m: i64) -> TimeDelta {
        TimeDelta::minutes(m)
    }

    fn cache(store: &Arc<FakeVersionStore>) -> VersionFreshnessCache {
        VersionFreshnessCache::new(store.clone(), true, minutes(WINDOW_MINUTES))
    }

    fn finished(name: &str) -> Pipeline {
        let mut pipeline = Pipeline::new(name, "main", false);
        pipeline.finished_recently = true;
        pipeline
    }

    fn idle(name: &str) -> Pipeline {
        Pipeline::new(name, "main", false)
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = VersionFreshnessCache::new(store.clone(), false, minutes(15));

        let mut pipelines = vec![finished("app")];
        let before = pipelines.clone();
        versions.annotate_at(&mut pipelines, t0()).await;

        assert_eq!(pipelines, before);
        assert_eq!(store.fetches(), 0);
    }

    #[tokio::test]
    async fn test_first_sight_is_never_new() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1\n");
        let mut versions = cache(&store);

        let mut pipelines = vec![finished("app")];
        versions.annotate_at(&mut pipelines, t0()).await;

        assert_eq!(pipelines[0].build_version, "v1");
        assert!(!pipelines[0].new_version);
        assert_eq!(
            versions.entry("app"),
            Some(&VersionCacheEntry {
                version: "v1".into(),
                updated_at: DateTime::<Utc>::UNIX_EPOCH,
            })
        );
    }

    #[tokio::test]
    async fn test_unchanged_version_stays_not_new() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = cache(&store);

        let mut pipelines = vec![finished("app")];
        versions.annotate_at(&mut pipelines, t0()).await;
        let mut pipelines = vec![finished("app")];
        versions
            .annotate_at(&mut pipelines, t0() + minutes(1))
            .await;

        assert_eq!(store.fetches(), 2);
        assert!(!pipelines[0].new_version);
    }

    #[tokio::test]
    async fn test_changed_version_decays_after_window() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = cache(&store);
        versions.annotate_at(&mut [finished("app")], t0()).await;

        let changed_at = t0() + minutes(5);
        store.set("app", "v2");
        let mut pipelines = vec![finished("app")];
        versions.annotate_at(&mut pipelines, changed_at).await;
        assert_eq!(pipelines[0].build_version, "v2");
        assert!(pipelines[0].new_version);

        let mut pipelines = vec![finished("app")];
        versions
            .annotate_at(&mut pipelines, changed_at + minutes(WINDOW_MINUTES - 1))
            .await;
        assert!(pipelines[0].new_version);

        let mut pipelines = vec![finished("app")];
        versions
            .annotate_at(&mut pipelines, changed_at + minutes(WINDOW_MINUTES))
            .await;
        assert!(!pipelines[0].new_version);
        assert_eq!(pipelines[0].build_version, "v2");
    }

    #[tokio::test]
    async fn test_cached_version_decays_without_fetching() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = cache(&store);
        versions.annotate_at(&mut [finished("app")], t0()).await;
        store.set("app", "v2");
        versions.annotate_at(&mut [finished("app")], t0()).await;
        assert_eq!(store.fetches(), 2);

        let mut pipelines = vec![idle("app")];
        versions
            .annotate_at(&mut pipelines, t0() + minutes(10))
            .await;
        assert_eq!(pipelines[0].build_version, "v2");
        assert!(pipelines[0].new_version);

        let mut pipelines = vec![idle("app")];
        versions
            .annotate_at(&mut pipelines, t0() + minutes(20))
            .await;
        assert!(!pipelines[0].new_version);
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_cached_version_expires_at_window_boundary() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = cache(&store);
        versions.annotate_at(&mut [finished("app")], t0()).await;
        store.set("app", "v2");
        versions.annotate_at(&mut [finished("app")], t0()).await;

        let boundary = t0() + minutes(WINDOW_MINUTES);
        let mut pipelines = vec![idle("app")];
        versions
            .annotate_at(&mut pipelines, boundary - TimeDelta::seconds(1))
            .await;
        assert!(pipelines[0].new_version);

        let mut pipelines = vec![idle("app")];
        versions.annotate_at(&mut pipelines, boundary).await;
        assert!(!pipelines[0].new_version);
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_missing_version_resets_baseline() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = cache(&store);
        versions.annotate_at(&mut [finished("app")], t0()).await;

        store.remove("app");
        let mut pipelines = vec![finished("app")];
        versions.annotate_at(&mut pipelines, t0()).await;
        assert_eq!(pipelines[0].build_version, "");
        assert!(!pipelines[0].new_version);
        assert_eq!(
            versions.entry("app").map(|e| e.version.as_str()),
            Some("")
        );

        // The same version coming back counts as new against the empty baseline.
        store.set("app", "v1");
        let mut pipelines = vec![finished("app")];
        versions.annotate_at(&mut pipelines, t0()).await;
        assert!(pipelines[0].new_version);
    }

    #[tokio::test]
    async fn test_paused_pipeline_is_untouched() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v9");
        let mut versions = cache(&store);

        let mut paused = Pipeline::new("app", "main", true);
        paused.finished_recently = true;
        paused.build_version = "v1".into();
        paused.new_version = true;
        let mut pipelines = vec![paused.clone()];

        versions.annotate_at(&mut pipelines, t0()).await;

        assert_eq!(pipelines[0], paused);
        assert_eq!(store.fetches(), 0);
        assert!(versions.entry("app").is_none());
    }

    #[tokio::test]
    async fn test_uncached_idle_pipeline_is_fetched() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        let mut versions = cache(&store);

        let mut pipelines = vec![idle("app")];
        versions.annotate_at(&mut pipelines, t0()).await;

        assert_eq!(store.fetches(), 1);
        assert_eq!(pipelines[0].build_version, "v1");
    }

    #[tokio::test]
    async fn test_repeated_annotate_is_idempotent() {
        let store = Arc::new(FakeVersionStore::default());
        store.set("app", "v1");
        store.set("lib", "2.0");
        let mut versions = cache(&store);
        versions
            .annotate_at(&mut [finished("app"), finished("lib")], t0())
            .await;
        store.set("app", "v2");
        versions.annotate_at(&mut [finished("app")], t0()).await;

        let now = t0() + minutes(3);
        let mut first = vec![idle("app"), idle("lib")];
        versions.annotate_at(&mut first, now).await;
        let entries_after_first: Vec<_> = ["app", "lib"]
            .iter()
            .map(|name| versions.entry(name).cloned())
            .collect();

        let mut second = first.clone();
        versions.annotate_at(&mut second, now).await;
        let entries_after_second: Vec<_> = ["app", "lib"]
            .iter()
            .map(|name| versions.entry(name).cloned())
            .collect();

        assert_eq!(first, second);
        assert_eq!(entries_after_first, entries_after_second);
        assert!(first[0].new_version);
        assert!(!first[1].new_version);
    }
}
