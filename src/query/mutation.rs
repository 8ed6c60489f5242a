//! Optimistic mutations
//!
//! A mutation snapshots every affected key, writes speculative data, runs the
//! server action, then either invalidates the keys (so the next read
//! revalidates against the server) or restores the snapshots exactly.

use super::cache::{EntrySnapshot, QueryCache};
use super::key::QueryKey;
use crate::error::Result;
use serde_json::Value;
use std::future::Future;

/// An in-progress optimistic update over a set of keys.
///
/// Dropping an unfinished mutation rolls it back.
#[derive(Debug)]
pub struct Mutation {
    cache: QueryCache,
    snapshots: Vec<EntrySnapshot>,
    finished: bool,
}

impl Mutation {
    /// Snapshot `keys` before any speculative write
    pub fn begin<'a>(cache: &QueryCache, keys: impl IntoIterator<Item = &'a QueryKey>) -> Self {
        let snapshots: Vec<EntrySnapshot> = keys.into_iter().map(|key| cache.snapshot(key)).collect();
        tracing::debug!(keys = snapshots.len(), "mutation started");
        Self {
            cache: cache.clone(),
            snapshots,
            finished: false,
        }
    }

    /// Keys covered by this mutation
    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.snapshots.iter().map(EntrySnapshot::key)
    }

    /// Write speculative data for `key` derived from its current data.
    ///
    /// Only keys snapshotted in [`begin`](Self::begin) can be patched, so that
    /// a rollback always covers every write. Returns whether a write happened.
    pub fn apply(&self, key: &QueryKey, patch: impl FnOnce(&Value) -> Option<Value>) -> bool {
        if !self.snapshots.iter().any(|s| s.key() == key) {
            tracing::warn!(key = %key, "ignoring optimistic write to a key outside the mutation");
            return false;
        }
        let Some(current) = self.cache.get_data(key) else {
            return false;
        };
        match patch(&current) {
            Some(next) => {
                self.cache.set_data(key, next);
                true
            }
            None => false,
        }
    }

    /// Server accepted the change: mark every affected key stale
    pub fn commit(mut self) {
        self.finished = true;
        for snapshot in &self.snapshots {
            self.cache.invalidate(snapshot.key());
        }
        tracing::debug!(keys = self.snapshots.len(), "mutation committed");
    }

    /// Server rejected the change: restore every affected key
    pub fn rollback(mut self) {
        self.restore_all();
    }

    fn restore_all(&mut self) {
        self.finished = true;
        for snapshot in self.snapshots.drain(..) {
            self.cache.restore(snapshot);
        }
        tracing::debug!("mutation rolled back");
    }
}

impl Drop for Mutation {
    fn drop(&mut self) {
        if !self.finished {
            self.restore_all();
        }
    }
}

impl QueryCache {
    /// Run `action` with optimistic updates applied to `keys`.
    ///
    /// `patch` maps each key's current data to its speculative value
    /// (`None` leaves the key alone). On success the keys are invalidated; on
    /// failure they are restored and the error is returned.
    pub async fn mutate<T, P, Fut>(&self, keys: &[QueryKey], patch: P, action: Fut) -> Result<T>
    where
        P: Fn(&QueryKey, &Value) -> Option<Value>,
        Fut: Future<Output = Result<T>>,
    {
        let mutation = Mutation::begin(self, keys);
        for key in keys {
            mutation.apply(key, |current| patch(key, current));
        }

        match action.await {
            Ok(value) => {
                mutation.commit();
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, "mutation failed, rolling back");
                mutation.rollback();
                Err(e)
            }
        }
    }
}
