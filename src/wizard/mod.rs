//! Property creation wizard state.
//!
//! `WizardStore` is the single source of truth for one property-creation
//! session. All operations are synchronous; network I/O lives in
//! [`crate::services::draft_sync`], which drives the store's sync tracker.

pub mod form;
pub mod history;
pub mod persist;
pub mod steps;
pub mod sync;
pub mod types;
pub mod validation;

pub use form::{BuildingUnit, DpeClass, FormData, FormPatch, DRAFT_ETAT};
pub use history::{History, HistorySnapshot, DEFAULT_HISTORY_LIMIT};
pub use steps::step_order;
pub use sync::{SaveOutcome, SaveTicket, SyncTracker};
pub use types::*;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::api::properties::{DraftCreated, DraftPayload, PropertyRecord};

#[cfg(test)]
mod tests;

/// Errors raised by wizard operations that consume external data
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("property '{id}' cannot be loaded into the wizard: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("unknown wizard step '{0}'")]
    UnknownStep(String),
}

/// In-progress property creation session
#[derive(Debug, Clone)]
pub struct WizardStore {
    property_id: Option<String>,
    building_id: Option<String>,
    current_step: WizardStep,
    mode: WizardMode,
    form_data: FormData,
    rooms: Vec<Room>,
    photos: Vec<Photo>,
    pending_photo_urls: Vec<String>,
    photo_import: PhotoImportProgress,
    history: History,
    sync: SyncTracker,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl WizardStore {
    /// Create an empty session keeping at most `history_limit` undo entries
    pub fn new(history_limit: usize) -> Self {
        Self {
            property_id: None,
            building_id: None,
            current_step: steps::FIRST_STEP,
            mode: WizardMode::Full,
            form_data: FormData::default(),
            rooms: Vec::new(),
            photos: Vec::new(),
            pending_photo_urls: Vec::new(),
            photo_import: PhotoImportProgress::default(),
            history: History::new(history_limit),
            sync: SyncTracker::default(),
        }
    }

    /// Restore every field to its initial value. Does not touch the service.
    pub fn reset(&mut self) {
        self.property_id = None;
        self.building_id = None;
        self.current_step = steps::FIRST_STEP;
        self.mode = WizardMode::Full;
        self.form_data = FormData::default();
        self.rooms.clear();
        self.photos.clear();
        self.pending_photo_urls.clear();
        self.photo_import = PhotoImportProgress::default();
        self.history.clear();
        self.sync.reset();
        debug!("Wizard reset");
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    pub fn building_id(&self) -> Option<&str> {
        self.building_id.as_deref()
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn mode(&self) -> WizardMode {
        self.mode
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: Uuid) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn sync(&self) -> &SyncTracker {
        &self.sync
    }

    /// Step order for the current property type and mode
    pub fn steps(&self) -> Vec<WizardStep> {
        step_order(self.form_data.property_type.as_ref(), self.mode)
    }

    /// 1-based position of the current step and the step count.
    /// Position is 0 when the current step is not part of the order.
    pub fn progress(&self) -> (usize, usize) {
        let order = self.steps();
        let position = order
            .iter()
            .position(|s| *s == self.current_step)
            .map_or(0, |i| i + 1);
        (position, order.len())
    }

    /// Issues blocking the current step
    pub fn validate_current_step(&self) -> Vec<validation::FieldIssue> {
        validation::validate_step(self.current_step, &self.form_data, &self.rooms)
    }

    // ─── Form data ──────────────────────────────────────────────────────────

    fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            form_data: self.form_data.clone(),
            rooms: self.rooms.clone(),
            photos: self.photos.clone(),
        }
    }

    fn restore(&mut self, snapshot: HistorySnapshot) {
        self.form_data = snapshot.form_data;
        self.rooms = snapshot.rooms;
        self.photos = snapshot.photos;
    }

    fn record_history(&mut self) {
        let before = self.snapshot();
        self.history.record(before);
    }

    /// Shallow-merge `patch` into the form data
    pub fn update_form_data(&mut self, patch: FormPatch) {
        self.record_history();
        self.form_data.merge(patch);
    }

    // ─── Navigation ─────────────────────────────────────────────────────────

    /// Jump to any step, bypassing the order
    pub fn set_step(&mut self, step: WizardStep) {
        self.current_step = step;
    }

    /// Advance one step; no-op on the last step
    pub fn next_step(&mut self) {
        if let Some(next) = steps::next_in(&self.steps(), self.current_step) {
            debug!(from = %self.current_step, to = %next, "Next wizard step");
            self.current_step = next;
        }
    }

    /// Go back one step; no-op on the first step
    pub fn prev_step(&mut self) {
        if let Some(prev) = steps::prev_in(&self.steps(), self.current_step) {
            debug!(from = %self.current_step, to = %prev, "Previous wizard step");
            self.current_step = prev;
        }
    }

    pub fn set_mode(&mut self, mode: WizardMode) {
        self.mode = mode;
    }

    // ─── Rooms ──────────────────────────────────────────────────────────────

    /// Append a room and return its generated id
    pub fn add_room(&mut self, patch: RoomPatch) -> Uuid {
        self.record_history();
        let room = Room::from_patch(patch);
        let id = room.id;
        self.rooms.push(room);
        id
    }

    /// Merge `patch` into a room. Returns `false` if no room has this id.
    pub fn update_room(&mut self, id: Uuid, patch: RoomPatch) -> bool {
        let Some(index) = self.rooms.iter().position(|r| r.id == id) else {
            debug!(room = %id, "update_room: room not found");
            return false;
        };
        self.record_history();
        self.rooms[index].apply(patch);
        true
    }

    /// Remove a room, keeping the order of the others.
    /// Returns `false` if no room has this id.
    pub fn remove_room(&mut self, id: Uuid) -> bool {
        let Some(index) = self.rooms.iter().position(|r| r.id == id) else {
            debug!(room = %id, "remove_room: room not found");
            return false;
        };
        self.record_history();
        self.rooms.remove(index);
        true
    }

    // ─── Photos ─────────────────────────────────────────────────────────────

    pub fn set_photos(&mut self, photos: Vec<Photo>) {
        self.record_history();
        self.photos = photos;
    }

    /// Queue photo URLs for import and restart the progress counter
    pub fn set_pending_photo_urls(&mut self, urls: Vec<String>) {
        self.photo_import = PhotoImportProgress {
            imported: 0,
            total: urls.len(),
        };
        self.pending_photo_urls = urls;
    }

    pub fn pending_photo_urls(&self) -> &[String] {
        &self.pending_photo_urls
    }

    pub fn photo_import_progress(&self) -> PhotoImportProgress {
        self.photo_import
    }

    /// Count one queued photo as imported
    pub fn record_photo_imported(&mut self) {
        if self.photo_import.imported < self.photo_import.total {
            self.photo_import.imported += 1;
        }
    }

    pub fn clear_pending_photo_urls(&mut self) {
        self.pending_photo_urls.clear();
        self.photo_import = PhotoImportProgress::default();
    }

    /// Turn every queued photo URL into a photo of the draft and empty the
    /// queue. The first imported photo becomes the main one if none is set.
    pub fn import_pending_photos(&mut self) -> usize {
        let urls = std::mem::take(&mut self.pending_photo_urls);
        if urls.is_empty() {
            return 0;
        }

        let mut photos = self.photos.clone();
        let mut needs_main = !photos.iter().any(|p| p.is_main);
        for url in &urls {
            let mut photo = Photo::new(Uuid::new_v4().to_string(), url.clone());
            photo.is_main = needs_main;
            needs_main = false;
            photos.push(photo);
            self.record_photo_imported();
            debug!(url = %url, "Imported photo");
        }
        self.set_photos(photos);
        self.photo_import = PhotoImportProgress::default();
        urls.len()
    }

    // ─── History ────────────────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) {
        let current = self.snapshot();
        if let Some(previous) = self.history.undo(current) {
            self.restore(previous);
        }
    }

    pub fn redo(&mut self) {
        let current = self.snapshot();
        if let Some(next) = self.history.redo(current) {
            self.restore(next);
        }
    }

    // ─── Remote draft ───────────────────────────────────────────────────────

    /// Seed ids and record status from a freshly created remote draft
    pub fn apply_created_draft(&mut self, created: DraftCreated) {
        debug!(id = %created.id, etat = %created.etat, "Draft created");
        self.property_id = Some(created.id);
        self.form_data.etat = created.etat;
        if created.building_id.is_some() {
            self.building_id = created.building_id;
        }
    }

    /// Replace the session with a stored property, e.g. to resume editing.
    /// History is cleared and navigation restarts at the first step.
    pub fn hydrate(&mut self, record: PropertyRecord) -> Result<(), WizardError> {
        let mut fields = record.fields;
        fields.insert("etat".to_string(), serde_json::Value::String(record.etat));
        let form_data: FormData = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| WizardError::InvalidRecord {
                id: record.id.clone(),
                reason: e.to_string(),
            })?;

        self.property_id = Some(record.id);
        self.building_id = record.building_id;
        self.form_data = form_data;
        self.rooms = record.rooms;
        self.photos = record.photos;
        self.current_step = steps::FIRST_STEP;
        self.history.clear();
        self.sync.reset();
        Ok(())
    }

    /// Body of the next draft update
    pub fn save_payload(&self) -> DraftPayload {
        DraftPayload {
            fields: self.form_data.to_payload(),
            building_id: self.building_id.clone(),
            rooms: self.rooms.clone(),
            photos: self.photos.clone(),
        }
    }

    pub fn begin_save(&mut self) -> SaveTicket {
        self.sync.begin_save()
    }

    /// Apply a save outcome; stale outcomes are ignored
    pub fn finish_save(&mut self, ticket: SaveTicket, outcome: SaveOutcome) -> bool {
        self.sync.finish_save(ticket, outcome)
    }

    // ─── Local persistence ──────────────────────────────────────────────────

    pub(crate) fn to_persisted(&self) -> persist::PersistedWizard {
        persist::PersistedWizard {
            property_id: self.property_id.clone(),
            building_id: self.building_id.clone(),
            current_step: self.current_step,
            mode: self.mode,
            form_data: self.form_data.clone(),
            rooms: self.rooms.clone(),
            photos: self.photos.clone(),
            pending_photo_urls: self.pending_photo_urls.clone(),
            photo_import: self.photo_import,
        }
    }

    pub(crate) fn from_persisted(saved: persist::PersistedWizard, history_limit: usize) -> Self {
        let mut store = Self::new(history_limit);
        store.property_id = saved.property_id;
        store.building_id = saved.building_id;
        store.current_step = saved.current_step;
        store.mode = saved.mode;
        store.form_data = saved.form_data;
        store.rooms = saved.rooms;
        store.photos = saved.photos;
        store.pending_photo_urls = saved.pending_photo_urls;
        store.photo_import = saved.photo_import;
        store
    }
}
