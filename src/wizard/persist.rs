//! Local draft file so a wizard session survives restarts.
//!
//! History and sync status are not persisted.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::form::FormData;
use super::types::{Photo, PhotoImportProgress, Room, WizardMode, WizardStep};
use super::WizardStore;
use crate::config::Config;

const DRAFT_FILE_NAME: &str = "wizard-draft.json";
const DRAFT_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedWizard {
    pub property_id: Option<String>,
    pub building_id: Option<String>,
    pub current_step: WizardStep,
    pub mode: WizardMode,
    pub form_data: FormData,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub pending_photo_urls: Vec<String>,
    #[serde(default)]
    pub photo_import: PhotoImportProgress,
}

#[derive(Debug, Serialize, Deserialize)]
struct DraftFileContents {
    version: u32,
    saved_at: DateTime<Utc>,
    wizard: PersistedWizard,
}

/// JSON file holding the current wizard session
#[derive(Debug, Clone)]
pub struct DraftFile {
    path: PathBuf,
}

impl DraftFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Draft file inside the configured state directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_path().join(DRAFT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the saved session, or `None` if nothing was saved yet
    pub fn load(&self, history_limit: usize) -> Result<Option<WizardStore>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read draft file {}", self.path.display()))?;
        let file: DraftFileContents =
            serde_json::from_str(&contents).context("Failed to parse draft file")?;
        if file.version > DRAFT_FILE_VERSION {
            anyhow::bail!(
                "Draft file version {} is newer than supported version {}",
                file.version,
                DRAFT_FILE_VERSION
            );
        }

        debug!(path = %self.path.display(), saved_at = %file.saved_at, "Loaded draft file");
        Ok(Some(WizardStore::from_persisted(file.wizard, history_limit)))
    }

    pub fn save(&self, store: &WizardStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        let file = DraftFileContents {
            version: DRAFT_FILE_VERSION,
            saved_at: Utc::now(),
            wizard: store.to_persisted(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write draft file {}", self.path.display()))?;
        Ok(())
    }

    /// Delete the saved session, if any
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove draft file")?;
        }
        Ok(())
    }
}
