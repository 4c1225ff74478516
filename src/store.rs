//! Snapshot persistence.
//!
//! The store holds exactly one current [`Snapshot`] in a single
//! pretty-printed UTF-8 JSON file. Each save replaces the file wholesale:
//! the new content is written to a sibling temporary file, flushed, and
//! renamed over the old one, so a reader never sees a half-written
//! snapshot and a failed save leaves the previous one in place.
//!
//! # Output Shape
//!
//! The producer always writes the wrapped shape:
//!
//! ```text
//! { "generated_at": "...", "item_count": 2, "items": [ ... ] }
//! ```
//!
//! [`SnapshotStore::load`] also accepts a bare `[ ... ]` list of items, the
//! shape older collectors wrote.

use crate::error::StoreError;
use crate::models::{NewsItem, OriginTag, Snapshot};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredShape {
    Wrapped(Snapshot),
    Bare(Vec<NewsItem>),
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot with `snapshot`.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), items = snapshot.item_count))]
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.path, json.as_bytes()).await?;
        info!(bytes = json.len(), "Wrote snapshot");
        Ok(())
    }

    /// Read the current snapshot; a missing file is an empty snapshot.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot stored yet");
                return Ok(Snapshot::empty());
            }
            Err(e) => return Err(io_err(&self.path, e)),
        };

        match serde_json::from_str::<StoredShape>(&raw)? {
            StoredShape::Wrapped(mut snapshot) => {
                if snapshot.item_count != snapshot.items.len() {
                    warn!(
                        declared = snapshot.item_count,
                        actual = snapshot.items.len(),
                        "Snapshot item_count disagrees with items; using actual"
                    );
                    snapshot.item_count = snapshot.items.len();
                }
                Ok(snapshot)
            }
            StoredShape::Bare(items) => {
                debug!(count = items.len(), "Loaded bare item list");
                let generated_at = fs::metadata(&self.path)
                    .await
                    .and_then(|m| m.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                Ok(Snapshot {
                    generated_at,
                    item_count: items.len(),
                    items,
                })
            }
        }
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write `bytes` to `path` via a temporary sibling file and a rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result: std::io::Result<()> = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Aggregate figures the display layer shows above the item list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_origin: BTreeMap<OriginTag, usize>,
    /// Items whose date is the collection date, not a reported one.
    pub estimated_dates: usize,
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            generated_at: snapshot.generated_at,
            total: snapshot.items.len(),
            by_source: snapshot
                .items
                .iter()
                .counts_by(|i| i.source_name.clone())
                .into_iter()
                .collect(),
            by_origin: snapshot
                .items
                .iter()
                .counts_by(|i| i.origin_tag)
                .into_iter()
                .collect(),
            estimated_dates: snapshot.items.iter().filter(|i| i.published_estimated).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(title: &str, source: &str, tag: OriginTag, day: u32) -> NewsItem {
        let mut item = NewsItem::draft(
            title,
            "summary",
            &format!("https://example.com/{day}"),
            source,
            tag,
            NaiveDate::from_ymd_opt(2025, 5, day),
        )
        .unwrap();
        item.title_translated = Some(format!("訳: {title}"));
        item
    }

    fn sample() -> Snapshot {
        Snapshot::new(vec![
            item("Junta extends emergency rule", "Reuters", OriginTag::International, 6),
            item("Border trade reopens", "The Irrawaddy", OriginTag::Myanmar, 5),
            item("Aid convoy reaches Sagaing", "Reuters", OriginTag::International, 4),
        ])
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let snap = sample();

        store.save(&snap).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, snap);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"item_count\": 3"), "expected pretty JSON: {raw}");
        assert!(raw.contains("訳: Border trade reopens"), "expected unescaped UTF-8");
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));

        store.save(&sample()).await.unwrap();
        let smaller = Snapshot::new(vec![item("Only one", "BBC News", OriginTag::UnitedKingdom, 1)]);
        store.save(&smaller).await.unwrap();

        assert_eq!(store.load().await.unwrap(), smaller);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temporary file left behind");
    }

    #[tokio::test]
    async fn test_missing_store_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("never_written.json"));
        let snap = store.load().await.unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.item_count, 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let store = SnapshotStore::new(&path);
        let original = sample();
        store.save(&original).await.unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir(dir.path().join(".snapshot.json.tmp")).unwrap();
        let err = store.save(&Snapshot::empty()).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        assert_eq!(store.load().await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_load_accepts_bare_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        let items = sample().items;
        std::fs::write(&path, serde_json::to_string_pretty(&items).unwrap()).unwrap();

        let snap = SnapshotStore::new(&path).load().await.unwrap();
        assert_eq!(snap.item_count, 3);
        assert_eq!(snap.items, items);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "{\"unexpected\": true}").unwrap();
        let err = SnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialize(_)));
    }

    #[test]
    fn test_stats_counts_by_source_and_origin() {
        let mut snap = sample();
        snap.items[1].published_estimated = true;
        let stats = SnapshotStats::from_snapshot(&snap);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_source["Reuters"], 2);
        assert_eq!(stats.by_source["The Irrawaddy"], 1);
        assert_eq!(stats.by_origin[&OriginTag::International], 2);
        assert_eq!(stats.by_origin[&OriginTag::Myanmar], 1);
        assert_eq!(stats.estimated_dates, 1);
    }
}
