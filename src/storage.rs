use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;

use crate::blocks::BlockDocument;
use crate::treatment::Treatment;

/// File name of the persisted collection inside the data directory. Plays
/// the role of the fixed storage key.
pub const COLLECTION_FILE: &str = "treatments.json";

/// A single keyed payload, read and replaced whole. Mirrors the
/// browser-local storage contract the collection was designed for.
pub trait TreatmentStorage: Send {
    fn read(&self) -> anyhow::Result<Option<String>>;
    fn write(&self, payload: &str) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsStorage {
    path: PathBuf,
}

impl LocalFsStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(COLLECTION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TreatmentStorage for LocalFsStorage {
    fn read(&self) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("read collection: {}", self.path.display()))
            }
        }
    }

    fn write(&self, payload: &str) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", self.path.display()))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create data dir: {}", parent.display()))?;

        let tmp_path = self
            .path
            .with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp_path, payload)
            .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("rename tmp to final: {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("clear collection: {}", self.path.display()))
            }
        }
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    payload: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Mutex::new(Some(payload.into())),
        }
    }
}

impl TreatmentStorage for MemoryStorage {
    fn read(&self) -> anyhow::Result<Option<String>> {
        Ok(self.payload.lock().expect("storage lock").clone())
    }

    fn write(&self, payload: &str) -> anyhow::Result<()> {
        *self.payload.lock().expect("storage lock") = Some(payload.to_owned());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.payload.lock().expect("storage lock") = None;
        Ok(())
    }
}

/// What the repair-on-load pass changed. The repair itself is silent at the
/// user level; this makes it observable to callers and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// (treatment id, chapter id) pairs whose content was reset to an empty
    /// document.
    pub reset_chapters: Vec<(String, String)>,
    /// The whole collection failed to parse and was discarded.
    pub collection_discarded: bool,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.reset_chapters.is_empty() && !self.collection_discarded
    }
}

/// Loads the collection, repairing malformed chapter blobs in place. A
/// corrupt top-level payload clears storage and yields an empty collection;
/// chapter-level repairs are persisted back so they run once.
pub fn load_collection(
    storage: &dyn TreatmentStorage,
) -> anyhow::Result<(Vec<Treatment>, RepairReport)> {
    let mut report = RepairReport::default();

    let Some(payload) = storage.read().context("read stored collection")? else {
        return Ok((Vec::new(), report));
    };

    let mut treatments: Vec<Treatment> = match serde_json::from_str(&payload) {
        Ok(treatments) => treatments,
        Err(err) => {
            tracing::warn!(error = %err, "stored collection is corrupt; discarding");
            storage.clear().context("clear corrupt collection")?;
            report.collection_discarded = true;
            return Ok((Vec::new(), report));
        }
    };

    for treatment in &mut treatments {
        for chapter in &mut treatment.chapters {
            if BlockDocument::is_well_formed(&chapter.content) {
                continue;
            }
            tracing::info!(
                treatment_id = %treatment.id,
                chapter_id = %chapter.id,
                chapter_title = %chapter.title,
                "resetting malformed chapter content"
            );
            chapter.content = BlockDocument::empty().to_json();
            report
                .reset_chapters
                .push((treatment.id.clone(), chapter.id.clone()));
        }
    }

    if !report.reset_chapters.is_empty() {
        save_collection(storage, &treatments).context("persist repaired collection")?;
    }

    Ok((treatments, report))
}

pub fn save_collection(
    storage: &dyn TreatmentStorage,
    treatments: &[Treatment],
) -> anyhow::Result<()> {
    let payload = serde_json::to_string(treatments).context("serialize collection")?;
    storage.write(&payload).context("write collection")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_empty_storage_is_clean() {
        let storage = MemoryStorage::new();
        let (treatments, report) = load_collection(&storage).unwrap();
        assert!(treatments.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn save_then_load_roundtrips_the_collection() {
        let storage = MemoryStorage::new();
        let mut treatment = Treatment::with_default_chapters("Spot");
        treatment.chapters[0].content =
            BlockDocument::from_paragraphs(["Opening line."]).to_json();
        save_collection(&storage, std::slice::from_ref(&treatment)).unwrap();

        let (loaded, report) = load_collection(&storage).unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, treatment.id);
        assert_eq!(loaded[0].title, "Spot");
        let ids = |t: &Treatment| {
            t.chapters
                .iter()
                .map(|c| (c.id.clone(), c.title.clone(), c.order))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&loaded[0]), ids(&treatment));
    }

    #[test]
    fn malformed_chapter_content_is_reset_and_persisted() {
        let storage = MemoryStorage::new();
        let mut treatment = Treatment::with_default_chapters("Spot");
        treatment.chapters[2].content = "{not valid json".to_owned();
        save_collection(&storage, std::slice::from_ref(&treatment)).unwrap();

        let (loaded, report) = load_collection(&storage).unwrap();
        assert_eq!(
            report.reset_chapters,
            vec![(treatment.id.clone(), treatment.chapters[2].id.clone())]
        );
        assert!(BlockDocument::parse(&loaded[0].chapters[2].content).is_some());

        // The repair was written back, so a second load is clean.
        let (_, second) = load_collection(&storage).unwrap();
        assert!(second.reset_chapters.is_empty());
    }

    #[test]
    fn corrupt_collection_is_discarded_and_cleared() {
        let storage = MemoryStorage::with_payload("][ definitely not json");
        let (treatments, report) = load_collection(&storage).unwrap();

        assert!(treatments.is_empty());
        assert!(report.collection_discarded);
        assert_eq!(storage.read().unwrap(), None);
    }
}
