//! Per-repository mutual exclusion for operations that mutate a working tree.
//!
//! Operations scheduled concurrently may live in the same version-control
//! repository. [`RepoLocks`] resolves a package path to its repository root
//! and serializes every caller holding the same root, while callers in
//! different repositories proceed concurrently. Waiters are served in
//! arrival order.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Marker whose presence identifies a repository root.
pub const REPOSITORY_MARKER: &str = ".git";

/// Walks upward from `path` until a directory containing `marker` is found.
///
/// When `path` names a file the search starts at its parent. Returns `None`
/// if the filesystem root is reached without a match.
pub fn find_repository_root(path: &Path, marker: &str) -> Option<PathBuf> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let start: &Path = if path.is_file() {
        path.parent()?
    } else {
        path.as_path()
    };

    start
        .ancestors()
        .filter(|dir| !dir.as_os_str().is_empty())
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

/// A binary lock with a FIFO waiter queue.
#[derive(Debug)]
pub struct RepoMutex {
    semaphore: Arc<Semaphore>,
    waiters: AtomicUsize,
    evict: Notify,
}

impl Default for RepoMutex {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            waiters: AtomicUsize::new(0),
            evict: Notify::new(),
        }
    }
}

struct WaiterSlot<'a>(&'a AtomicUsize);

impl<'a> WaiterSlot<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for WaiterSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RepoMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock, queuing behind earlier callers if it is held.
    ///
    /// Returns `None` if the caller was evicted while waiting.
    pub async fn lock(&self) -> Option<OwnedSemaphorePermit> {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Some(permit);
        }
        let _slot = WaiterSlot::enter(&self.waiters);
        let evicted = self.evict.notified();
        tokio::select! {
            biased;
            _ = evicted => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        }
    }

    /// Acquires the lock only if it is free.
    pub fn try_lock(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).try_acquire_owned().ok()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    #[inline]
    pub fn queued(&self) -> usize {
        self.waiters.load(Ordering::SeqCst)
    }

    /// Fails every caller currently queued. The holder is unaffected.
    fn evict_waiters(&self) {
        self.evict.notify_waiters();
    }
}

/// Holds a repository lock until dropped.
#[derive(Debug)]
pub struct RepoGuard {
    root: PathBuf,
    _permit: OwnedSemaphorePermit,
}

impl RepoGuard {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for RepoGuard {
    fn drop(&mut self) {
        trace!(root = %self.root.display(), "released repository lock");
    }
}

/// Snapshot of lock manager state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStats {
    pub tracked_roots: usize,
    pub locked_roots: usize,
    pub queued_waiters: usize,
}

/// Registry of per-repository mutexes.
///
/// Construct one per process and share it (behind an `Arc`) with every
/// operation that mutates a repository. Mutexes are created on first use.
#[derive(Debug)]
pub struct RepoLocks {
    mutexes: DashMap<PathBuf, Arc<RepoMutex>>,
    marker: String,
}

impl Default for RepoLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::with_marker(REPOSITORY_MARKER)
    }

    /// Uses `marker` instead of `.git` to identify repository roots.
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            mutexes: DashMap::new(),
            marker: marker.into(),
        }
    }

    pub fn resolve_repository_root(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        find_repository_root(path.as_ref(), &self.marker)
    }

    fn mutex_for(&self, root: &Path) -> Arc<RepoMutex> {
        let entry = self
            .mutexes
            .entry(root.to_path_buf())
            .or_insert_with(|| Arc::new(RepoMutex::new()));
        Arc::clone(entry.value())
    }

    /// Locks the repository containing `path`.
    ///
    /// Returns `Ok(None)` when `path` is not inside a repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockReleased`] if the manager is destroyed while
    /// this caller is queued.
    pub async fn lock(&self, path: impl AsRef<Path>) -> Result<Option<RepoGuard>> {
        let Some(root) = self.resolve_repository_root(path.as_ref()) else {
            debug!(path = %path.as_ref().display(), "no repository root, running unlocked");
            return Ok(None);
        };

        let mutex = self.mutex_for(&root);
        if mutex.is_locked() {
            debug!(root = %root.display(), queued = mutex.queued() + 1, "waiting for repository lock");
        }
        let permit = mutex
            .lock()
            .await
            .ok_or_else(|| Error::LockReleased { root: root.clone() })?;

        trace!(root = %root.display(), "acquired repository lock");
        Ok(Some(RepoGuard {
            root,
            _permit: permit,
        }))
    }

    /// Runs `operation` while holding the lock for the repository
    /// containing `path`, or unlocked if there is none.
    ///
    /// The lock is released on every exit path, including panics.
    pub async fn with_lock<F, Fut, T>(&self, path: impl AsRef<Path>, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.lock(path).await?;
        let output = operation().await;
        drop(guard);
        Ok(output)
    }

    pub fn stats(&self) -> LockStats {
        self.mutexes
            .iter()
            .fold(LockStats::default(), |mut stats, entry| {
                stats.tracked_roots += 1;
                if entry.value().is_locked() {
                    stats.locked_roots += 1;
                }
                stats.queued_waiters += entry.value().queued();
                stats
            })
    }

    /// Fails every queued waiter and forgets idle mutexes.
    ///
    /// Queued waiters fail with [`Error::LockReleased`]. Mutexes that are
    /// still held stay tracked, so callers arriving afterwards queue behind
    /// the current holder instead of racing it.
    pub fn destroy(&self) {
        for entry in self.mutexes.iter() {
            entry.value().evict_waiters();
        }
        self.mutexes.retain(|_, mutex| mutex.is_locked());
        debug!(retained = self.mutexes.len(), "repository locks destroyed");
    }
}
