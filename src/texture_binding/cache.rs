use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;

use crate::shader_graph::NodeSocket;

use super::{ChannelDefault, ChannelSet, FilterPolicy, OutputKind, TextureResolution};

/// Identity of one resolver query. Sockets compare by (node, port, group path), never by
/// what they happen to carry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub primary: NodeSocket,
    pub channels: Vec<Option<NodeSocket>>,
    pub defaults: Vec<Option<ChannelDefault>>,
    pub kind: OutputKind,
    pub filter: FilterPolicy,
}

impl CacheKey {
    pub fn new(primary: &NodeSocket, channels: &ChannelSet, kind: OutputKind, filter: FilterPolicy) -> Self {
        Self {
            primary: primary.clone(),
            channels: channels.sockets.clone(),
            defaults: channels.defaults.clone(),
            kind,
            filter,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Per-session memo table. A key is computed at most once until [`ResultCache::clear`].
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, Arc<TextureResolution>>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&mut self, key: CacheKey, compute: F) -> Arc<TextureResolution>
    where
        F: FnOnce() -> TextureResolution,
    {
        match self.entries.entry(key) {
            Entry::Occupied(e) => {
                self.hits += 1;
                log::trace!("[texture-cache] hit for {:?}", e.key().primary);
                Arc::clone(e.get())
            }
            Entry::Vacant(e) => {
                self.misses += 1;
                Arc::clone(e.insert(Arc::new(compute())))
            }
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<TextureResolution>> {
        self.entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
