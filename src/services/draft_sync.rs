//! Draft Sync - keeps the remote property draft in step with the wizard.
//!
//! A `WizardSession` owns the store for one property-creation flow and
//! pushes changes to the properties service. The first save lazily creates
//! the remote draft; later saves are debounced and ordered by the store's
//! sync tracker so a slow, older response never overwrites a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::error::ServiceError;
use crate::api::properties::PropertiesService;
use crate::config::WizardConfig;
use crate::wizard::{SaveOutcome, SyncStatus, WizardError, WizardStore};

/// Errors raised while opening a session or creating its draft
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("session was reset while the draft was being created")]
    Reset,
}

/// State shared between the session and its background save tasks
#[derive(Clone)]
struct Shared {
    store: Arc<Mutex<WizardStore>>,
    service: Arc<dyn PropertiesService>,
    /// Serializes draft creation so concurrent saves create one draft
    create_guard: Arc<tokio::sync::Mutex<()>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WizardStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Id of the remote draft, creating it if needed. `epoch` is the reset
    /// epoch the caller started under. `Ok(None)` means the store was reset
    /// since then; a draft created meanwhile is left orphaned on the service
    /// and not applied.
    async fn ensure_draft(&self, epoch: u64) -> Result<Option<String>, ServiceError> {
        let _guard = self.create_guard.lock().await;

        let existing = {
            let store = self.lock();
            if store.sync().epoch() != epoch {
                return Ok(None);
            }
            store.property_id().map(str::to_owned)
        };
        if let Some(id) = existing {
            return Ok(Some(id));
        }

        let created = self.service.create_draft().await?;
        let id = created.id.clone();

        let mut store = self.lock();
        if store.sync().epoch() != epoch {
            warn!(id = %id, "Session reset during draft creation, discarding draft");
            return Ok(None);
        }
        store.apply_created_draft(created);
        info!(id = %id, service = self.service.name(), "Created property draft");
        Ok(Some(id))
    }

    /// Run one save and return its own outcome as a status. The store's
    /// status may differ when a newer save is still running.
    async fn save(&self) -> SyncStatus {
        let (ticket, epoch) = {
            let mut store = self.lock();
            let ticket = store.begin_save();
            debug!(seq = ticket.seq(), in_flight = store.sync().in_flight(), "Save started");
            (ticket, store.sync().epoch())
        };

        let outcome = match self.ensure_draft(epoch).await {
            Ok(Some(id)) => {
                let payload = {
                    let store = self.lock();
                    if store.sync().is_stale(ticket) {
                        debug!(seq = ticket.seq(), "Save superseded before update");
                        return store.sync_status();
                    }
                    store.save_payload()
                };
                match self.service.update(&id, &payload).await {
                    Ok(updated) => {
                        debug!(id = %updated.id, seq = ticket.seq(), "Draft saved");
                        SaveOutcome::Saved
                    }
                    Err(e) => {
                        warn!(id = %id, seq = ticket.seq(), error = %e, "Draft update failed");
                        SaveOutcome::Failed(e.to_string())
                    }
                }
            }
            Ok(None) => return self.lock().sync_status(),
            Err(e) => {
                warn!(seq = ticket.seq(), error = %e, "Draft creation failed");
                SaveOutcome::Failed(e.to_string())
            }
        };

        let status = match outcome {
            SaveOutcome::Saved => SyncStatus::Saved,
            SaveOutcome::Failed(_) => SyncStatus::Error,
        };
        self.lock().finish_save(ticket, outcome);
        status
    }
}

/// One property-creation flow bound to a properties service
pub struct WizardSession {
    shared: Shared,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl WizardSession {
    /// Start a fresh session
    pub fn new(service: Arc<dyn PropertiesService>, config: &WizardConfig) -> Self {
        let mut store = WizardStore::new(config.history_limit);
        store.set_mode(config.default_mode);
        Self::from_store(service, config, store)
    }

    /// Wrap an existing store, e.g. one loaded from the local draft file
    pub fn from_store(
        service: Arc<dyn PropertiesService>,
        config: &WizardConfig,
        store: WizardStore,
    ) -> Self {
        Self {
            shared: Shared {
                store: Arc::new(Mutex::new(store)),
                service,
                create_guard: Arc::new(tokio::sync::Mutex::new(())),
            },
            debounce: Duration::from_millis(config.autosave_debounce_ms),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Load property `id` from the service and continue editing it
    pub async fn resume(
        service: Arc<dyn PropertiesService>,
        config: &WizardConfig,
        id: &str,
    ) -> Result<Self, SessionError> {
        let record = service.get_by_id(id).await?;
        let mut store = WizardStore::new(config.history_limit);
        store.set_mode(config.default_mode);
        store.hydrate(record)?;
        info!(id = %id, "Resumed property draft");
        Ok(Self::from_store(service, config, store))
    }

    /// Run `f` against the store without scheduling a save
    pub fn read<R>(&self, f: impl FnOnce(&WizardStore) -> R) -> R {
        f(&self.shared.lock())
    }

    /// Run `f` against the store and schedule a debounced save
    pub fn update<R>(&self, f: impl FnOnce(&mut WizardStore) -> R) -> R {
        let result = f(&mut self.shared.lock());
        self.schedule_save();
        result
    }

    /// Run `f` against the store without scheduling a save.
    /// Navigation and mode changes are local and go through here.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut WizardStore) -> R) -> R {
        f(&mut self.shared.lock())
    }

    /// Copy of the current store
    pub fn snapshot(&self) -> WizardStore {
        self.shared.lock().clone()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.shared.lock().sync_status()
    }

    /// Create the remote draft if the session has none yet
    pub async fn ensure_draft(&self) -> Result<String, SessionError> {
        let epoch = self.shared.lock().sync().epoch();
        self.shared
            .ensure_draft(epoch)
            .await?
            .ok_or(SessionError::Reset)
    }

    /// Save immediately, bypassing the debounce. Returns how this save
    /// ended (`Saved` or `Error`), even if a newer save owns the store's
    /// status; use [`sync_status`](Self::sync_status) for the live value.
    /// A save cancelled by `reset` returns the live status. Local state is
    /// never rolled back.
    pub async fn save_now(&self) -> SyncStatus {
        // Supersede any debounced save still waiting
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.save().await
    }

    /// Queue a save after the debounce period. A later call supersedes a
    /// save that has not started yet.
    pub fn schedule_save(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let shared = self.shared.clone();
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "Autosave superseded");
                return;
            }
            shared.save().await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every scheduled save to run or be superseded
    pub async fn flush(&self) -> SyncStatus {
        let handles: Vec<_> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *pending)
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Autosave task failed");
            }
        }
        self.sync_status()
    }

    /// Import queued photo URLs and schedule a save if any were imported
    pub fn import_pending_photos(&self) -> usize {
        let imported = self.with_store(WizardStore::import_pending_photos);
        if imported > 0 {
            self.schedule_save();
        }
        imported
    }

    /// Clear the session locally. The remote draft is left untouched.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::properties::InMemoryPropertiesService;
    use crate::wizard::{FormPatch, PropertyType, WizardMode};

    fn config(debounce_ms: u64) -> WizardConfig {
        WizardConfig {
            autosave_debounce_ms: debounce_ms,
            ..Default::default()
        }
    }

    fn session(debounce_ms: u64) -> (Arc<InMemoryPropertiesService>, WizardSession) {
        let service = Arc::new(InMemoryPropertiesService::new());
        let session = WizardSession::new(service.clone(), &config(debounce_ms));
        (service, session)
    }

    #[tokio::test]
    async fn test_new_session_uses_default_mode() {
        let service = Arc::new(InMemoryPropertiesService::new());
        let cfg = WizardConfig {
            default_mode: WizardMode::Fast,
            ..Default::default()
        };
        let session = WizardSession::new(service, &cfg);
        assert_eq!(session.read(WizardStore::mode), WizardMode::Fast);
        assert_eq!(session.sync_status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_ensure_draft_creates_once() {
        let (service, session) = session(0);

        let first = session.ensure_draft().await.unwrap();
        let second = session.ensure_draft().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.create_calls(), 1);
        assert_eq!(session.read(|s| s.property_id().map(str::to_owned)), Some(first));
    }

    #[tokio::test]
    async fn test_concurrent_first_saves_create_one_draft() {
        let (service, session) = session(0);
        service.set_create_delay(Some(Duration::from_millis(50)));

        let (a, b) = tokio::join!(session.save_now(), session.save_now());

        assert_eq!(a, SyncStatus::Saved);
        assert_eq!(b, SyncStatus::Saved);
        assert_eq!(service.create_calls(), 1);
        assert_eq!(service.update_calls(), 2);
        assert!(session.read(|s| s.property_id().is_some()));
    }

    #[tokio::test]
    async fn test_reset_during_draft_creation_discards_draft() {
        let (service, session) = session(0);
        service.set_create_delay(Some(Duration::from_millis(100)));
        session.with_store(|s| {
            s.update_form_data(FormPatch {
                ville: Some(Some("Rennes".to_string())),
                ..Default::default()
            });
        });

        let reset = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.reset();
        };
        let (status, ()) = tokio::join!(session.save_now(), reset);

        assert_eq!(status, SyncStatus::Idle);
        assert_eq!(service.create_calls(), 1);
        assert_eq!(service.update_calls(), 0);
        let store = session.snapshot();
        assert!(store.property_id().is_none());
        assert!(store.form_data().ville.is_none());
        assert_eq!(store.sync_status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_ensure_draft_reports_reset() {
        let (service, session) = session(0);
        service.set_create_delay(Some(Duration::from_millis(100)));

        let reset = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.reset();
        };
        let (result, ()) = tokio::join!(session.ensure_draft(), reset);

        assert!(matches!(result, Err(SessionError::Reset)));
        assert!(session.read(|s| s.property_id().is_none()));

        // A fresh attempt after the reset works
        service.set_create_delay(None);
        assert!(session.ensure_draft().await.is_ok());
        assert_eq!(service.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_save_now_pushes_fields() {
        let (service, session) = session(0);
        session.with_store(|s| {
            s.update_form_data(FormPatch {
                property_type: Some(Some(PropertyType::Studio)),
                ville: Some(Some("Lyon".to_string())),
                ..Default::default()
            });
        });

        assert_eq!(session.save_now().await, SyncStatus::Saved);

        let id = session.read(|s| s.property_id().map(str::to_owned)).unwrap();
        let record = service.record(&id).unwrap();
        assert_eq!(record.fields["ville"], "Lyon");
        assert_eq!(record.fields["type"], "studio");
    }

    #[tokio::test]
    async fn test_save_failure_keeps_local_state() {
        let (service, session) = session(0);
        service.set_failure(Some(ServiceError::network("connection refused")));
        session.with_store(|s| {
            s.update_form_data(FormPatch {
                ville: Some(Some("Lille".to_string())),
                ..Default::default()
            });
        });

        assert_eq!(session.save_now().await, SyncStatus::Error);
        assert_eq!(
            session.read(|s| s.form_data().ville.clone()),
            Some("Lille".to_string())
        );
        assert!(session.read(|s| s.sync().last_error().is_some()));
    }

    #[tokio::test]
    async fn test_debounced_saves_coalesce() {
        let (service, session) = session(20);
        for city in ["A", "B", "C"] {
            session.update(|s| {
                s.update_form_data(FormPatch {
                    ville: Some(Some(city.to_string())),
                    ..Default::default()
                });
            });
        }

        assert_eq!(session.flush().await, SyncStatus::Saved);
        assert_eq!(service.update_calls(), 1);

        let id = session.read(|s| s.property_id().map(str::to_owned)).unwrap();
        assert_eq!(service.record(&id).unwrap().fields["ville"], "C");
    }

    #[tokio::test]
    async fn test_import_pending_photos() {
        let (_service, session) = session(0);
        session.with_store(|s| {
            s.set_pending_photo_urls(vec![
                "https://img.test/a.jpg".to_string(),
                "https://img.test/b.jpg".to_string(),
            ]);
        });

        assert_eq!(session.import_pending_photos(), 2);
        session.flush().await;

        let store = session.snapshot();
        assert_eq!(store.photos().len(), 2);
        assert!(store.photos()[0].is_main);
        assert!(!store.photos()[1].is_main);
        assert!(store.pending_photo_urls().is_empty());
        assert_eq!(store.sync_status(), SyncStatus::Saved);

        assert_eq!(session.import_pending_photos(), 0);
    }
}
