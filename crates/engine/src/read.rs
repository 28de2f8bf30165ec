//! Read path: `get()`, `list_keys()`, and `fold()`.
//!
//! Every reader holds the shared half of the engine lock for its whole
//! critical section, index lookup and positional file read included, so a
//! concurrent merge can never delete a segment out from under a read.

use datastore::StoreError;

use crate::{Engine, Error, Result, State};

impl Engine {
    /// Looks up `key` and returns its current value.
    ///
    /// Returns [`Error::KeyNotFound`] when the key is absent or its stored
    /// value is the tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.state.read();
        self.lookup(&state, key)
    }

    /// All keys currently indexed, in unspecified order.
    pub fn list_keys(&self) -> Vec<Vec<u8>> {
        self.state.read().keydir.keys().cloned().collect()
    }

    /// Folds `f` over every live key/value pair.
    ///
    /// Values are read under the same shared guard as the key snapshot; keys
    /// that resolve to "does not exist" (tombstones) are skipped. Any other
    /// read failure aborts the fold.
    pub fn fold<A, F>(&self, mut f: F, mut acc: A) -> Result<A>
    where
        F: FnMut(&[u8], &[u8], A) -> A,
    {
        let state = self.state.read();

        for (key, entry) in state.keydir.iter() {
            match self
                .datastore
                .read_value(entry.file_id, key, entry.value_pos, entry.value_size)
            {
                Ok(value) => acc = f(key, &value, acc),
                Err(StoreError::KeyNotExist { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(acc)
    }

    /// Shared lookup used by `get` and the existence check in `delete`.
    /// The caller supplies whichever guard it already holds.
    pub(crate) fn lookup(&self, state: &State, key: &[u8]) -> Result<Vec<u8>> {
        let entry = state
            .keydir
            .get(key)
            .ok_or_else(|| Error::key_not_found(key))?;

        Ok(self
            .datastore
            .read_value(entry.file_id, key, entry.value_pos, entry.value_size)?)
    }
}
