use std::path::PathBuf;

use serde::Deserialize;

use crate::config::SchoolConfig;
use crate::models::user::load_profile;
use crate::models::AccountStatus;
use crate::permissions::Session;
use crate::storage::{MemoryStorage, SqliteStorage, Storage};
use crate::stores::Stores;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub storage: Box<dyn Storage>,
    pub stores: Stores,
    pub session: Option<Session>,
    pub config: SchoolConfig,
}

impl AppState {
    /// Opens the configured workspace, or an in-memory backend when none is set.
    pub fn from_config(config: SchoolConfig) -> anyhow::Result<Self> {
        let (workspace, storage): (Option<PathBuf>, Box<dyn Storage>) =
            match config.storage.workspace.clone() {
                Some(path) => {
                    let s = SqliteStorage::open(&path)?;
                    tracing::info!(workspace = %path.display(), "workspace opened");
                    (Some(path), Box::new(s))
                }
                None => {
                    let s = match config.storage.quota_bytes {
                        Some(q) => MemoryStorage::with_quota(q),
                        None => MemoryStorage::new(),
                    };
                    (None, Box::new(s))
                }
            };
        let stores = Stores::load(storage.as_ref());
        Ok(Self {
            workspace,
            storage,
            stores,
            session: None,
            config,
        })
    }

    pub fn replace_storage(&mut self, workspace: Option<PathBuf>, storage: Box<dyn Storage>) {
        self.stores = Stores::load(storage.as_ref());
        self.storage = storage;
        self.workspace = workspace;
        self.session = None;
    }

    /// Reloads every store and re-reads the signed-in user and their profile.
    /// The session ends if that user is gone or no longer active.
    pub fn reload(&mut self) {
        self.stores = Stores::load(self.storage.as_ref());
        let Some(current) = self.session.take() else {
            return;
        };
        match self.stores.users.get(&current.user.id) {
            Some(user) if user.account_status == AccountStatus::Active => {
                let (profile, revision) = load_profile(self.storage.as_ref(), user);
                self.session = Some(Session::new(user.clone(), profile, revision));
            }
            _ => tracing::info!(user = %current.user.id, "session ended by reload"),
        }
    }
}
