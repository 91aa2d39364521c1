//! Session snapshot persistence

use async_trait::async_trait;
use chrono::Utc;
use rp_types::{AppError, AppResult, SavedSession, SessionSnapshot};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the snapshot for one account. Called once per successful
    /// sign-in; desktop and mobile surfaces keep separate sessions.
    async fn save(
        &self,
        identity: &str,
        snapshot: &SessionSnapshot,
        is_mobile: bool,
    ) -> AppResult<()>;
}

/// Stores sessions as JSON files under `<base>/<identity>/`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_dir: PathBuf,
}

fn surface_name(is_mobile: bool) -> &'static str {
    if is_mobile {
        "mobile"
    } else {
        "desktop"
    }
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn session_path(&self, identity: &str, is_mobile: bool) -> PathBuf {
        self.base_dir
            .join(identity)
            .join(format!("{}_session.json", surface_name(is_mobile)))
    }

    /// Load a previously saved snapshot, if one exists.
    pub async fn load(
        &self,
        identity: &str,
        is_mobile: bool,
    ) -> AppResult<Option<SessionSnapshot>> {
        let path = self.session_path(identity, is_mobile);
        if !path.exists() {
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(&path).await?;
        let saved: SavedSession = serde_json::from_str(&raw)
            .map_err(|e| AppError::Session(format!("corrupt session {}: {}", path.display(), e)))?;

        debug!("restored session from {}", path.display());
        Ok(Some(saved.snapshot))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(
        &self,
        identity: &str,
        snapshot: &SessionSnapshot,
        is_mobile: bool,
    ) -> AppResult<()> {
        let path = self.session_path(identity, is_mobile);
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::Session("session path has no parent".to_string()))?;
        tokio::fs::create_dir_all(&parent).await?;

        let saved = SavedSession {
            saved_at: Utc::now(),
            identity: identity.to_string(),
            surface: surface_name(is_mobile).to_string(),
            snapshot: snapshot.clone(),
        };
        let raw = serde_json::to_string_pretty(&saved)?;
        tokio::fs::write(&path, raw).await?;

        info!("session saved to {}", path.display());
        Ok(())
    }
}
