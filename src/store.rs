use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::extras::GeneratedExtras;
use crate::storage::{self, RepairReport, TreatmentStorage};
use crate::treatment::{Chapter, SettingsPatch, Treatment, Version, new_id};

/// Change notifications for UI surfaces observing the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    TreatmentList,
    ActiveTreatment,
    Extras,
    Generating,
}

/// Owns the treatment collection, the active treatment, and ephemeral
/// generation state. Every mutation is synchronous and atomic in memory and
/// is followed by a write-through of the whole collection. Operations that
/// need an active treatment silently no-op when there is none.
pub struct DocumentStore {
    treatments: Vec<Treatment>,
    active_id: Option<String>,
    generated_extras: Option<GeneratedExtras>,
    generating: bool,
    storage: Box<dyn TreatmentStorage>,
    events: broadcast::Sender<StoreEvent>,
}

impl DocumentStore {
    /// Loads the collection from storage, repairing malformed chapter blobs.
    pub fn open(storage: Box<dyn TreatmentStorage>) -> anyhow::Result<(Self, RepairReport)> {
        let (treatments, report) = storage::load_collection(storage.as_ref())?;
        let (events, _) = broadcast::channel(64);
        Ok((
            Self {
                treatments,
                active_id: None,
                generated_extras: None,
                generating: false,
                storage,
                events,
            },
            report,
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn persist(&self) -> anyhow::Result<()> {
        storage::save_collection(self.storage.as_ref(), &self.treatments)
            .context("persist treatment collection")
    }

    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    pub fn active(&self) -> Option<&Treatment> {
        let id = self.active_id.as_deref()?;
        self.treatments.iter().find(|t| t.id == id)
    }

    fn active_mut(&mut self) -> Option<&mut Treatment> {
        let id = self.active_id.clone()?;
        self.treatments.iter_mut().find(|t| t.id == id)
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn generated_extras(&self) -> Option<&GeneratedExtras> {
        self.generated_extras.as_ref()
    }

    pub fn create_treatment(&mut self, title: impl Into<String>) -> anyhow::Result<String> {
        let treatment = Treatment::with_default_chapters(title);
        let id = treatment.id.clone();
        self.treatments.push(treatment);
        self.active_id = Some(id.clone());
        self.persist()?;
        self.emit(StoreEvent::TreatmentList);
        self.emit(StoreEvent::ActiveTreatment);
        Ok(id)
    }

    /// Makes an existing treatment active. Unknown ids are ignored.
    pub fn select_treatment(&mut self, id: &str) -> bool {
        if !self.treatments.iter().any(|t| t.id == id) {
            return false;
        }
        self.active_id = Some(id.to_owned());
        self.emit(StoreEvent::ActiveTreatment);
        true
    }

    pub fn delete_treatment(&mut self, id: &str) -> anyhow::Result<()> {
        self.treatments.retain(|t| t.id != id);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
            self.emit(StoreEvent::ActiveTreatment);
        }
        self.persist()?;
        self.emit(StoreEvent::TreatmentList);
        Ok(())
    }

    /// Renames the active treatment. Empty titles are rejected so a commit
    /// never leaves the title blank.
    pub fn rename_treatment(&mut self, title: &str) -> anyhow::Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        treatment.title = title.to_owned();
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        self.emit(StoreEvent::TreatmentList);
        Ok(())
    }

    /// Re-saves the active treatment, bumping `updated_at`. Safe to run
    /// unconditionally; the autosave timer calls this on its interval.
    pub fn touch(&mut self) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    pub fn add_chapter(
        &mut self,
        title: impl Into<String>,
        is_custom: bool,
    ) -> anyhow::Result<Option<String>> {
        let Some(treatment) = self.active_mut() else {
            return Ok(None);
        };
        let order = treatment.chapters.len();
        let chapter = Chapter::new(title, is_custom, order);
        let id = chapter.id.clone();
        treatment.chapters.push(chapter);
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(Some(id))
    }

    /// Removes a chapter from the active treatment. Only custom chapters may
    /// be removed; requests against default chapters are ignored.
    pub fn remove_chapter(&mut self, chapter_id: &str) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        let Some(chapter) = treatment.chapter(chapter_id) else {
            return Ok(());
        };
        if !chapter.is_custom {
            tracing::warn!(chapter_id, "refusing to remove default chapter");
            return Ok(());
        }
        treatment.chapters.retain(|c| c.id != chapter_id);
        for (order, chapter) in treatment.chapters.iter_mut().enumerate() {
            chapter.order = order;
        }
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    pub fn rename_chapter(&mut self, chapter_id: &str, title: &str) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        let Some(chapter) = treatment.chapter_mut(chapter_id) else {
            return Ok(());
        };
        chapter.title = title.to_owned();
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    /// Replaces a chapter's content blob. Does not create a version.
    pub fn update_chapter_content(
        &mut self,
        chapter_id: &str,
        content: impl Into<String>,
    ) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        let Some(chapter) = treatment.chapter_mut(chapter_id) else {
            return Ok(());
        };
        chapter.content = content.into();
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    /// Accepts a full reordered chapter list and reassigns `order` from the
    /// list index. The input must be a permutation of the current chapters;
    /// partial reorders are rejected.
    pub fn reorder_chapters(&mut self, mut chapters: Vec<Chapter>) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };

        let mut current_ids = treatment
            .chapters
            .iter()
            .map(|c| c.id.clone())
            .collect::<Vec<_>>();
        let mut supplied_ids = chapters.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
        current_ids.sort();
        supplied_ids.sort();
        if current_ids != supplied_ids {
            anyhow::bail!("chapter reorder must supply a permutation of all chapters");
        }

        for (order, chapter) in chapters.iter_mut().enumerate() {
            chapter.order = order;
        }
        treatment.chapters = chapters;
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    pub fn set_alternative_titles(
        &mut self,
        chapter_id: &str,
        titles: Vec<String>,
    ) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        let Some(chapter) = treatment.chapter_mut(chapter_id) else {
            return Ok(());
        };
        chapter.alternative_titles = Some(titles);
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    pub fn set_word_count_limit(&mut self, chapter_id: &str, limit: u32) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        treatment
            .settings
            .word_count_limits
            .insert(chapter_id.to_owned(), limit);
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> anyhow::Result<()> {
        let Some(treatment) = self.active_mut() else {
            return Ok(());
        };
        treatment.settings.apply(patch);
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(())
    }

    /// Deep-snapshots the active treatment's chapter list as a new version.
    pub fn save_version(&mut self) -> anyhow::Result<Option<String>> {
        let Some(treatment) = self.active_mut() else {
            return Ok(None);
        };
        let version = Version {
            id: new_id(),
            treatment_id: treatment.id.clone(),
            timestamp: Utc::now(),
            chapters: treatment.chapters.clone(),
        };
        let id = version.id.clone();
        treatment.versions.push(version);
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(Some(id))
    }

    /// Replaces the live chapter list with a version snapshot. The pre-load
    /// state is snapshotted as a new version first, so nothing is lost.
    pub fn load_version(&mut self, version_id: &str) -> anyhow::Result<bool> {
        let Some(treatment) = self.active() else {
            return Ok(false);
        };
        let Some(snapshot) = treatment
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .map(|v| v.chapters.clone())
        else {
            return Ok(false);
        };

        self.save_version().context("snapshot pre-load state")?;

        let treatment = self.active_mut().expect("active treatment checked above");
        treatment.chapters = snapshot;
        treatment.updated_at = Utc::now();
        self.persist()?;
        self.emit(StoreEvent::ActiveTreatment);
        Ok(true)
    }

    pub fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
        self.emit(StoreEvent::Generating);
    }

    pub fn set_generated_extras(&mut self, extras: Option<GeneratedExtras>) {
        self.generated_extras = extras;
        self.emit(StoreEvent::Extras);
    }
}

/// Periodically re-saves the active treatment. Idempotent; runs until the
/// handle is aborted or every store handle is dropped.
pub fn spawn_autosave(
    store: Arc<Mutex<DocumentStore>>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let result = store.lock().expect("store lock").touch();
            if let Err(err) = result {
                tracing::warn!(error = %format!("{err:#}"), "autosave failed");
            }
        }
    })
}
