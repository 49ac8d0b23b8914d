//! Snapshot acquisition.
//!
//! The engine never captures counters itself; it asks a provider at the
//! start of each refresh. Providers own freshness policy, which keeps the
//! computation pipeline deterministic over whatever snapshot they hand out.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::snapshot::UsageSnapshot;

/// Source of usage snapshots. Called once per refresh; `None` means no
/// snapshot could be produced this cycle.
pub trait SnapshotProvider: Send {
    fn latest(&mut self) -> Option<Arc<UsageSnapshot>>;
}

/// Hands out one fixed snapshot forever.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    snapshot: Arc<UsageSnapshot>,
}

impl StaticProvider {
    pub fn new(snapshot: UsageSnapshot) -> Self {
        StaticProvider {
            snapshot: Arc::new(snapshot),
        }
    }
}

impl SnapshotProvider for StaticProvider {
    fn latest(&mut self) -> Option<Arc<UsageSnapshot>> {
        Some(Arc::clone(&self.snapshot))
    }
}

/// Reads a snapshot document from disk on every call.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileProvider { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotProvider for JsonFileProvider {
    fn latest(&mut self) -> Option<Arc<UsageSnapshot>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to read snapshot {}: {err}", self.path.display());
                return None;
            }
        };
        match serde_json::from_str::<UsageSnapshot>(&raw) {
            Ok(snapshot) => Some(Arc::new(snapshot)),
            Err(err) => {
                warn!("failed to parse snapshot {}: {err}", self.path.display());
                None
            }
        }
    }
}

/// Memoizes another provider until explicitly invalidated, so a burst of
/// queries over different periods reads one coherent capture.
///
/// A failed fetch is not memoized; the next call retries the source.
#[derive(Debug)]
pub struct CachedProvider<P> {
    inner: P,
    cached: Option<Arc<UsageSnapshot>>,
}

impl<P: SnapshotProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        CachedProvider {
            inner,
            cached: None,
        }
    }

    /// Drop the memoized snapshot; the next refresh re-reads the source.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }
}

impl<P: SnapshotProvider> SnapshotProvider for CachedProvider<P> {
    fn latest(&mut self) -> Option<Arc<UsageSnapshot>> {
        if self.cached.is_none() {
            self.cached = self.inner.latest();
        }
        self.cached.clone()
    }
}
