//! The stream registry: tracks every in-flight exchange by `StreamId`,
//! alongside its state machine and response-side flow control.
//!
//! Grounded on the teacher's `proto::streams` module
//! (`examples/carllerche-h2/src/proto/streams/mod.rs`), which splits the
//! same concerns across `store`/`state`/`flow_control` submodules.

pub(crate) mod flow_control;
pub(crate) mod state;
pub(crate) mod store;

pub(crate) use state::{Stream, StreamState};
pub use state::StreamMetrics;
pub(crate) use store::Store;

use crate::frame::StreamId;

/// Owns the registry and the small pieces of cross-stream bookkeeping the
/// session needs (next-id allocation lives in `codec::Codec`; this is
/// purely the local bookkeeping of "which streams exist and what state are
/// they in").
pub(crate) struct Streams {
    store: Store,
}

impl Streams {
    pub fn new() -> Streams {
        Streams { store: Store::new() }
    }

    pub fn begin(&mut self, id: StreamId) -> usize {
        self.store.insert(id, Stream::new())
    }

    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.store.get_by_id(id)
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.store.get_by_id_mut(id)
    }

    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        self.store.remove(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterates every tracked stream id, used by GOAWAY handling to decide
    /// which in-flight streams must be failed vs. left to finish (spec
    /// §4.6).
    pub fn ids(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.store.ids()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Stream)> {
        self.store.iter_mut()
    }
}
