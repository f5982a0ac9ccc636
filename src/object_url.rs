//! Revocable references to transient image bytes.
//!
//! A rendered preview is handed to callers as a `blob:` URL, resolvable
//! through the [`ObjectUrlRegistry`] that minted it, until it is revoked.
//! [`ObjectUrl`] is the owning handle: [`ObjectUrl::revoke`] releases the
//! bytes early and is safe to call any number of times; dropping the handle
//! revokes as well, so every exit path of the owner releases the entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

const SCHEME: &str = "blob:";
const AUTHORITY: &str = "pdf-ingest";

#[derive(Default)]
struct Entries {
    live: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl Entries {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mints and resolves `blob:pdf-ingest/<uuid>` URLs. Cheap to clone.
#[derive(Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<Entries>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return the owning handle.
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>) -> ObjectUrl {
        let url = format!("{SCHEME}{AUTHORITY}/{}", Uuid::new_v4());
        self.entries.lock().insert(url.clone(), bytes.into());
        debug!("Created object URL {}", url);
        ObjectUrl {
            url,
            entries: Arc::clone(&self.entries),
            revoked: AtomicBool::new(false),
        }
    }

    /// The bytes behind `url`, if it is still live.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.entries.lock().get(url).cloned()
    }

    /// Release `url`. Only `blob:` URLs are considered; anything else, and
    /// any URL already revoked, is ignored. Returns whether an entry was freed.
    pub fn revoke_url(&self, url: &str) -> bool {
        revoke_in(&self.entries, url)
    }

    /// Number of URLs created and not yet revoked.
    pub fn outstanding(&self) -> usize {
        self.entries.lock().len()
    }
}

impl std::fmt::Debug for ObjectUrlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectUrlRegistry")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Owning handle to one registered URL.
pub struct ObjectUrl {
    url: String,
    entries: Arc<Entries>,
    revoked: AtomicBool,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Release the bytes. Repeated calls are no-ops.
    pub fn revoke(&self) {
        if !self.revoked.swap(true, Ordering::SeqCst) {
            revoke_in(&self.entries, &self.url);
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl std::fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectUrl")
            .field("url", &self.url)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

fn revoke_in(entries: &Entries, url: &str) -> bool {
    if !url.starts_with(SCHEME) {
        return false;
    }
    let freed = entries.lock().remove(url).is_some();
    if freed {
        debug!("Revoked object URL {}", url);
    }
    freed
}
