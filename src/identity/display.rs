//! Non-authoritative display profile mirrored into a local key/value store.
//!
//! The dashboard client uses this for cosmetic personalization (name, avatar)
//! without a backend round trip. `DisplayProfile` is deliberately a separate type from
//! [`UserIdentity`]: nothing in the route guard accepts it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::principal::UserIdentity;

pub const PROFILE_KEY: &str = "xcontact:user";
pub const GUEST_NAME: &str = "Guest";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl DisplayProfile {
    pub fn guest() -> Self { Self::default() }

    pub fn is_guest(&self) -> bool { self.email.is_none() && self.display_name.is_none() }

    /// display_name, then email, then "Guest".
    pub fn display_name(&self) -> String {
        [self.display_name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(GUEST_NAME)
            .to_string()
    }
}

impl From<&UserIdentity> for DisplayProfile {
    fn from(u: &UserIdentity) -> Self {
        let avatar_url = match u.extra.get("avatar_url") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        Self {
            id: u.id.as_ref().map(|id| id.to_string()),
            email: Some(u.email.clone()),
            display_name: u.display_name.clone(),
            avatar_url,
            role_label: Some(u.role.to_string()),
            cached_at: None,
        }
    }
}

/// Minimal local key/value storage.
pub trait ProfileStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self { Self::default() }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, key: &str) -> Result<Option<String>> { Ok(self.entries.read().get(key).cloned()) }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One JSON file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self { Self { dir: dir.as_ref().to_path_buf() } }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' }).collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl ProfileStore for FileProfileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() { return Ok(None); }
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(raw))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(key);
        std::fs::write(&path, value).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

/// Read-through/write-through mirror of the display profile.
pub struct ProfileCache<S: ProfileStore> {
    store: S,
    key: String,
}

impl<S: ProfileStore> ProfileCache<S> {
    pub fn new(store: S) -> Self { Self { store, key: PROFILE_KEY.to_string() } }

    /// Stored profile, or the guest profile when absent, unreadable or malformed.
    pub fn load(&self) -> DisplayProfile {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return DisplayProfile::guest(),
            Err(e) => {
                warn!(target: "profile", error = %e, "profile cache unreadable; using guest profile");
                return DisplayProfile::guest();
            }
        };
        match serde_json::from_str::<DisplayProfile>(&raw) {
            Ok(p) => p,
            Err(e) => {
                debug!(target: "profile", error = %e, "malformed cached profile ignored");
                DisplayProfile::guest()
            }
        }
    }

    /// Write the profile, or remove the entry when `None`. Failures are logged only.
    pub fn store(&self, profile: Option<&DisplayProfile>) {
        let outcome = match profile {
            Some(p) => {
                let mut stamped = p.clone();
                stamped.cached_at = Some(Utc::now());
                serde_json::to_string(&stamped)
                    .map_err(anyhow::Error::from)
                    .and_then(|json| self.store.set(&self.key, &json))
            }
            None => self.store.remove(&self.key),
        };
        if let Err(e) = outcome {
            warn!(target: "profile", error = %e, "profile cache write failed");
        }
    }

    pub fn clear(&self) { self.store(None) }
}
