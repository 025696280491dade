//! The stream registry: a slab of `Stream` records indexed by a
//! `StreamId -> slab key` map.
//!
//! Grounded on the teacher's `proto::streams::store::Store`
//! (`examples/carllerche-h2/src/proto/streams/store.rs`), which pairs a
//! `slab::Slab` with a `HashMap` for the same reason: stream ids are
//! sparse and client-chosen (odd, monotonically increasing), so they can't
//! be used as slab keys directly.

use fnv::FnvHashMap;
use slab::Slab;

use crate::frame::StreamId;

use super::state::Stream;

pub(crate) struct Store {
    slab: Slab<Stream>,
    ids: FnvHashMap<StreamId, usize>,
}

impl Store {
    pub fn new() -> Store {
        Store {
            slab: Slab::new(),
            ids: FnvHashMap::default(),
        }
    }

    /// Inserts a newly-allocated stream and records its id.
    pub fn insert(&mut self, id: StreamId, mut stream: Stream) -> usize {
        stream.id = Some(id);
        let key = self.slab.insert(stream);
        self.ids.insert(id, key);
        key
    }

    pub fn resolve(&self, id: StreamId) -> Option<usize> {
        self.ids.get(&id).copied()
    }

    pub fn get(&self, key: usize) -> Option<&Stream> {
        self.slab.get(key)
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut Stream> {
        self.slab.get_mut(key)
    }

    pub fn get_by_id(&self, id: StreamId) -> Option<&Stream> {
        self.resolve(id).and_then(|k| self.slab.get(k))
    }

    pub fn get_by_id_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        let key = self.resolve(id)?;
        self.slab.get_mut(key)
    }

    /// Removes a stream once it has reached `ReadDone` (or failed) and its
    /// handle has been dropped by the caller. The id stays out of
    /// circulation regardless (stream ids are never reused), only the slab
    /// slot and the id->key entry are freed.
    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        let key = self.ids.remove(&id)?;
        Some(self.slab.remove(key))
    }

    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.ids.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Stream)> {
        self.slab.iter_mut()
    }
}
