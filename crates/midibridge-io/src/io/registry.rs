//! Endpoints registered with one activation loop.

use std::fmt;

/// Identifies an endpoint across the input and output loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub(crate) u64);

impl EndpointId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owned by exactly one loop; iteration order is registration order.
pub struct EndpointRegistry<T> {
    entries: Vec<(EndpointId, T)>,
}

impl<T> EndpointRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Replaces (and returns) an existing entry with the same id.
    pub fn add(&mut self, id: EndpointId, entry: T) -> Option<T> {
        let previous = self.remove(id);
        self.entries.push((id, entry));
        previous
    }

    pub fn remove(&mut self, id: EndpointId) -> Option<T> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, id: EndpointId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EndpointId, &mut T)> {
        self.entries.iter_mut().map(|(id, entry)| (*id, entry))
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (EndpointId, T)> + '_ {
        self.entries.drain(..)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for EndpointRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
