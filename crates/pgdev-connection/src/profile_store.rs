//! Durable registry of connection profiles

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use pgdev_core::{ConnectionProfile, PgDevError, Result};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
struct StoredProfile {
    /// Insertion order, kept across replacements
    seq: u64,
    profile: ConnectionProfile,
}

/// Profiles keyed by name
///
/// Names are unique. Insertion order is remembered so the profile file keeps
/// its order and "first profile" has a stable meaning. A store built with a
/// path rewrites the whole `connections.json` document on `save`.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: DashMap<String, StoredProfile>,
    next_seq: AtomicU64,
    path: Option<PathBuf>,
}

impl ProfileStore {
    /// Create a store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create a store from a list of profiles, without a backing file
    pub fn from_profiles(profiles: impl IntoIterator<Item = ConnectionProfile>) -> Self {
        let store = Self::in_memory();
        for profile in profiles {
            store.insert(profile);
        }
        store
    }

    /// Load the profile document at `path`
    ///
    /// A missing file yields an empty store bound to `path`.
    #[tracing::instrument]
    pub async fn load(path: &Path) -> Result<Self> {
        let store = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        if !tokio::fs::try_exists(path).await? {
            tracing::debug!("profile file does not exist yet");
            return Ok(store);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let profiles: Vec<ConnectionProfile> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)?
        };
        tracing::info!(count = profiles.len(), "profiles loaded");

        for profile in profiles {
            if store.insert(profile.clone()).is_some() {
                tracing::warn!(name = %profile.name(), "duplicate profile name, keeping the last one");
            }
        }
        Ok(store)
    }

    /// Write every profile to the backing file, in insertion order
    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            tracing::trace!("profile store has no backing file");
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let profiles = self.ordered();
        let content = serde_json::to_string_pretty(&profiles)?;
        tokio::fs::write(path, content).await?;

        tracing::info!(count = profiles.len(), path = ?path, "profiles saved");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or replace a profile, returning the one it replaced
    pub fn insert(&self, profile: ConnectionProfile) -> Option<ConnectionProfile> {
        let name = profile.name().to_string();
        if name.trim().is_empty() {
            tracing::warn!("ignoring profile without a name");
            return None;
        }

        match self.profiles.entry(name) {
            Entry::Occupied(mut entry) => {
                let previous = std::mem::replace(&mut entry.get_mut().profile, profile);
                Some(previous)
            }
            Entry::Vacant(entry) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                entry.insert(StoredProfile { seq, profile });
                None
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<ConnectionProfile> {
        self.profiles.remove(name).map(|(_, stored)| stored.profile)
    }

    pub fn get(&self, name: &str) -> Option<ConnectionProfile> {
        self.profiles.get(name).map(|stored| stored.profile.clone())
    }

    /// Get a profile or fail with `ProfileNotFound`
    pub fn require(&self, name: &str) -> Result<ConnectionProfile> {
        self.get(name)
            .ok_or_else(|| PgDevError::ProfileNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Name of the earliest inserted profile still present
    pub fn first_name(&self) -> Option<String> {
        self.profiles
            .iter()
            .min_by_key(|entry| entry.value().seq)
            .map(|entry| entry.key().clone())
    }

    /// All profiles in insertion order
    pub fn ordered(&self) -> Vec<ConnectionProfile> {
        let mut stored: Vec<StoredProfile> =
            self.profiles.iter().map(|e| e.value().clone()).collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.profile).collect()
    }
}
