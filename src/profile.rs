//! Persisted user identity records.
//!
//! A profile is created the first time a handle is looked up, from what the
//! code host reports, and is never removed automatically. Local overrides
//! (preferred names, affiliations, ORCIDs) are layered on at read time so
//! editing the config takes effect without touching the record file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cache::Flush;
use crate::config::ProfileOverrides;
use crate::domain::UserProfile;
use crate::error::{ReleaseNotesError, Result};
use crate::github::CodeHost;

/// Anything that can produce a [UserProfile] for a handle
pub trait ProfileLookup {
    fn profile(&mut self, handle: &str) -> Result<UserProfile>;
}

impl ProfileLookup for HashMap<String, UserProfile> {
    fn profile(&mut self, handle: &str) -> Result<UserProfile> {
        self.get(handle)
            .cloned()
            .ok_or_else(|| ReleaseNotesError::lookup(format!("no profile for {}", handle)))
    }
}

/// Handle to profile record file
#[derive(Debug, Default)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    profiles: BTreeMap<String, UserProfile>,
    dirty: bool,
}

impl ProfileStore {
    /// Load the store at `path`; a missing file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let profiles = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(ProfileStore {
            path: Some(path),
            profiles,
            dirty: false,
        })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: &str) -> Option<&UserProfile> {
        self.profiles.get(handle)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Stored profile for `handle`, asking the code host on first use
    pub fn get_or_fetch<H: CodeHost + ?Sized>(
        &mut self,
        host: &mut H,
        handle: &str,
    ) -> Result<&UserProfile> {
        if !self.profiles.contains_key(handle) {
            debug!("Fetching profile for {}", handle);
            let profile = match host.get_user(handle)? {
                Some(user) => UserProfile {
                    handle: handle.to_string(),
                    name: user.name.clone().filter(|n| !n.trim().is_empty()),
                    affiliation: None,
                    orcid: None,
                    email: user.email.clone(),
                    bot: user.is_bot(),
                },
                None => UserProfile {
                    handle: handle.to_string(),
                    name: None,
                    affiliation: None,
                    orcid: None,
                    email: None,
                    bot: false,
                },
            };
            self.profiles.insert(handle.to_string(), profile);
            self.dirty = true;
        }
        self.profiles
            .get(handle)
            .ok_or_else(|| ReleaseNotesError::lookup(format!("no profile for {}", handle)))
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, serde_json::to_string_pretty(&self.profiles)?)?;
            info!("Saved {} profiles to {}", self.profiles.len(), path.display());
        }
        self.dirty = false;
        Ok(())
    }
}

impl Flush for ProfileStore {
    fn flush(&mut self) -> Result<()> {
        ProfileStore::flush(self)
    }
}

/// Apply local overrides on top of a stored profile
pub fn apply_overrides(mut profile: UserProfile, overrides: &ProfileOverrides) -> UserProfile {
    if let Some(name) = overrides.names.get(&profile.handle) {
        profile.name = Some(name.clone());
    }
    if let Some(affiliation) = overrides.affiliations.get(&profile.handle) {
        profile.affiliation = Some(affiliation.clone());
    }
    if let Some(orcid) = overrides.orcids.get(&profile.handle) {
        profile.orcid = Some(orcid.clone());
    }
    profile
}

/// [ProfileLookup] backed by a [ProfileStore], a code host and local overrides
pub struct ProfileResolver<'a, H: CodeHost + ?Sized> {
    store: &'a mut ProfileStore,
    host: &'a mut H,
    overrides: &'a ProfileOverrides,
}

impl<'a, H: CodeHost + ?Sized> ProfileResolver<'a, H> {
    pub fn new(
        store: &'a mut ProfileStore,
        host: &'a mut H,
        overrides: &'a ProfileOverrides,
    ) -> Self {
        ProfileResolver {
            store,
            host,
            overrides,
        }
    }
}

impl<H: CodeHost + ?Sized> ProfileLookup for ProfileResolver<'_, H> {
    fn profile(&mut self, handle: &str) -> Result<UserProfile> {
        let stored = self.store.get_or_fetch(self.host, handle)?.clone();
        Ok(apply_overrides(stored, self.overrides))
    }
}
