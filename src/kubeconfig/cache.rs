//! Bounded per-cluster kubeconfig cache.
//!
//! Locking discipline: one `std::sync::Mutex` guards the LRU map and the
//! in-flight gate table. It is never held across an `.await` and never held
//! while provisioning or deleting files. Each key has an async gate so that
//! concurrent misses for the same cluster share one provisioning run, while
//! different clusters provision in parallel.
//!
//! A second mutex holds the pin table for shared artifact paths. A provision
//! that will write a shared path pins it first, and every file release checks
//! pins and live entries and deletes while holding that table, so a release
//! can never remove a file that a concurrent provision is about to hand out.
//! Lock order is pins, then state.

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::artifact::{Artifact, ArtifactKey};
use super::dispose::{ArtifactDisposer, FileDisposer};
use super::lru::BoundedLru;
use super::mode::KubeconfigMode;
use super::provisioner::{ArtifactProvisioner, ProvisionRequest};
use crate::errors::Result;

/// Fetched kubeconfigs are treated as stale this long before their
/// temporary credential expires.
pub const EXPIRY_MARGIN_MINUTES: i64 = 5;

type Gate = Arc<tokio::sync::Mutex<()>>;
type Pins = HashMap<PathBuf, usize>;

struct State {
    entries: BoundedLru<ArtifactKey, Artifact>,
    in_flight: HashMap<ArtifactKey, Gate>,
}

enum Lookup {
    Hit(PathBuf),
    Miss,
}

/// Keeps a shared path from being deleted while it is being provisioned
struct PathPin<'a> {
    pins: &'a Mutex<Pins>,
    path: PathBuf,
}

impl Drop for PathPin<'_> {
    fn drop(&mut self) {
        let mut pins = lock_pins(self.pins);
        if let Some(count) = pins.get_mut(&self.path) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&self.path);
            }
        }
    }
}

pub struct KubeconfigCache {
    state: Mutex<State>,
    pins: Mutex<Pins>,
    provisioner: Arc<dyn ArtifactProvisioner>,
    disposer: Arc<dyn ArtifactDisposer>,
}

impl std::fmt::Debug for KubeconfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("KubeconfigCache")
            .field("len", &state.entries.len())
            .field("capacity", &state.entries.capacity())
            .finish_non_exhaustive()
    }
}

impl KubeconfigCache {
    /// Cache holding at most `max_entries` artifacts, deleting Owned files on eviction
    pub fn new(provisioner: Arc<dyn ArtifactProvisioner>, max_entries: usize) -> Self {
        Self::with_disposer(provisioner, Arc::new(FileDisposer), max_entries)
    }

    pub fn with_disposer(
        provisioner: Arc<dyn ArtifactProvisioner>,
        disposer: Arc<dyn ArtifactDisposer>,
        max_entries: usize,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                entries: BoundedLru::new(max_entries),
                in_flight: HashMap::new(),
            }),
            pins: Mutex::new(HashMap::new()),
            provisioner,
            disposer,
        }
    }

    /// Path of a usable kubeconfig for the request, provisioning on a miss.
    pub async fn get_path(&self, request: &ProvisionRequest) -> Result<PathBuf> {
        let key = ArtifactKey::new(&request.cluster_id, &request.region);

        if let Lookup::Hit(path) = self.lookup(&key, request) {
            return Ok(path);
        }

        let gate = self.gate(&key);
        let result = {
            let _guard = gate.lock().await;
            // Whoever held the gate before us may have filled the entry.
            match self.lookup(&key, request) {
                Lookup::Hit(path) => Ok(path),
                Lookup::Miss => {
                    let _pin = self.provisioner.shared_path(request).map(|path| self.pin(path));
                    self.provision_and_insert(key.clone(), request).await
                }
            }
        };
        self.release_gate(&key, gate);
        result
    }

    /// Drop every entry, deleting Owned files. Borrowed files are untouched.
    pub fn cleanup(&self) -> usize {
        let drained = {
            let mut state = self.lock();
            state.in_flight.clear();
            state.entries.drain()
        };
        let count = drained.len();

        for (key, artifact) in &drained {
            debug!(cluster_id = %key.cluster_id, region = %key.region, path = %artifact.path.display(), "Releasing kubeconfig");
        }
        self.release(drained.into_iter().map(|(_, artifact)| artifact).collect());
        info!(entries = count, "Kubeconfig cache cleaned up");
        count
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.capacity()
    }

    pub fn contains(&self, cluster_id: &str, region: &str) -> bool {
        self.lock().entries.contains_key(&ArtifactKey::new(cluster_id, region))
    }

    /// Current entry for a cluster without touching recency
    pub fn entry(&self, cluster_id: &str, region: &str) -> Option<Artifact> {
        self.lock().entries.peek(&ArtifactKey::new(cluster_id, region)).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pin(&self, path: PathBuf) -> PathPin<'_> {
        *lock_pins(&self.pins).entry(path.clone()).or_default() += 1;
        PathPin { pins: &self.pins, path }
    }

    /// Hit check with eager validation; a stale entry is removed and released.
    fn lookup(&self, key: &ArtifactKey, request: &ProvisionRequest) -> Lookup {
        let stale = {
            let mut state = self.lock();
            let Some(artifact) = state.entries.peek(key) else {
                debug!(cluster_id = %key.cluster_id, region = %key.region, mode = %request.mode, "Kubeconfig cache miss");
                return Lookup::Miss;
            };

            if let Some(reason) = stale_reason(artifact, request) {
                debug!(cluster_id = %key.cluster_id, region = %key.region, reason, "Discarding stale kubeconfig entry");
                state.entries.remove(key)
            } else {
                let path = artifact.path.clone();
                state.entries.get(key);
                debug!(cluster_id = %key.cluster_id, region = %key.region, path = %path.display(), "Kubeconfig cache hit");
                return Lookup::Hit(path);
            }
        };

        self.release(stale.into_iter().collect());
        Lookup::Miss
    }

    async fn provision_and_insert(&self, key: ArtifactKey, request: &ProvisionRequest) -> Result<PathBuf> {
        let artifact = self.provisioner.provision(request).await?;
        let path = artifact.path.clone();

        let displaced = {
            let mut state = self.lock();
            let displaced = state.entries.insert(key.clone(), artifact);
            for (evicted_key, evicted) in &displaced {
                if evicted_key != &key {
                    info!(
                        cluster_id = %evicted_key.cluster_id,
                        region = %evicted_key.region,
                        path = %evicted.path.display(),
                        "Evicted least recently used kubeconfig"
                    );
                }
            }
            displaced
        };

        self.release(displaced.into_iter().map(|(_, artifact)| artifact).collect());
        Ok(path)
    }

    /// Dispose artifacts whose path is neither pinned nor referenced by a
    /// live entry. Runs under the pin table so the check and the delete are
    /// one step for any concurrent provision of the same path.
    fn release(&self, artifacts: Vec<Artifact>) {
        if artifacts.is_empty() {
            return;
        }
        let pins = lock_pins(&self.pins);
        let mut released: Vec<PathBuf> = Vec::new();
        for artifact in artifacts {
            if released.contains(&artifact.path) {
                continue;
            }
            if pins.contains_key(&artifact.path) {
                debug!(path = %artifact.path.display(), "Kubeconfig file is being provisioned again, keeping it");
                continue;
            }
            if self.lock().entries.values().any(|live| live.path == artifact.path) {
                continue;
            }
            self.disposer.dispose(&artifact);
            released.push(artifact.path);
        }
    }

    fn gate(&self, key: &ArtifactKey) -> Gate {
        let mut state = self.lock();
        Arc::clone(state.in_flight.entry(key.clone()).or_default())
    }

    /// Gates are cloned and dropped only under the state lock, so the strong
    /// count seen here is exact.
    fn release_gate(&self, key: &ArtifactKey, gate: Gate) {
        let mut state = self.lock();
        drop(gate);
        if state.in_flight.get(key).is_some_and(|g| Arc::strong_count(g) == 1) {
            state.in_flight.remove(key);
        }
    }
}

fn lock_pins(pins: &Mutex<Pins>) -> MutexGuard<'_, Pins> {
    pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn stale_reason(artifact: &Artifact, request: &ProvisionRequest) -> Option<&'static str> {
    if artifact.mode != request.mode {
        return Some("mode changed");
    }
    if request.mode == KubeconfigMode::Local && request.resolved_local_path().as_ref() != Some(&artifact.path) {
        return Some("local path changed");
    }
    if artifact.mode.is_fetched() && artifact.is_expired(Utc::now() + ChronoDuration::minutes(EXPIRY_MARGIN_MINUTES)) {
        return Some("credential expiring");
    }
    if !artifact.path.exists() {
        return Some("file missing");
    }
    None
}
