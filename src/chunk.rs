/// Sentinel for a missing chunk link.
pub const NONE: usize = usize::MAX;

// Chunks up to this many entries are scanned linearly instead of bisected.
const LINEAR_SCAN_LIMIT: usize = 16;

// Upper bound on the entries preallocated per chunk.
const PREALLOCATE_LIMIT: usize = 256;

/// An entry stored in a chunk, ordered by its key.
pub trait Entry: Copy {
    fn key(&self) -> u32;
}

impl Entry for u32 {
    #[inline]
    fn key(&self) -> u32 {
        *self
    }
}

/// Entry of an index chunk: a separator key copied from the level below and
/// the slot of the chunk it leads to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub key: u32,
    pub child: usize,
}

impl Link {
    #[must_use]
    pub fn new(key: u32, child: usize) -> Self {
        Link { key, child }
    }
}

impl Entry for Link {
    #[inline]
    fn key(&self) -> u32 {
        self.key
    }
}

/// Result of splitting an overflowing chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Split {
    /// First key of the chunk that stayed in place.
    pub left_key: u32,
    /// Slot of the newly allocated right sibling.
    pub right: usize,
    /// First key of the right sibling, to be copied one level up.
    pub separator: u32,
}

/// Fixed-capacity sorted run of entries. Leaf chunks hold keys, index chunks
/// hold [`Link`]s. Every chunk knows its right sibling on the same level.
#[derive(Clone, Debug)]
pub struct Chunk<E> {
    pub entries: Vec<E>,
    pub next: usize,
    capacity: usize,
}

impl<E: Entry> Chunk<E> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Chunk {
            entries: Vec::with_capacity(capacity.min(PREALLOCATE_LIMIT) + 1),
            next: NONE,
            capacity,
        }
    }

    #[must_use]
    pub fn from_entries(entries: Vec<E>, capacity: usize) -> Self {
        let mut chunk = Chunk::new(capacity);
        chunk.entries.extend(entries);
        chunk
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when one more entry would overflow the chunk.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn first_key(&self) -> Option<u32> {
        self.entries.first().map(Entry::key)
    }

    #[must_use]
    pub fn last_key(&self) -> Option<u32> {
        self.entries.last().map(Entry::key)
    }

    /// Lower bound: index of the first entry whose key is `>= key`, or
    /// `len()` when every entry is smaller.
    #[must_use]
    pub fn locate(&self, key: u32) -> usize {
        if self.entries.len() <= LINEAR_SCAN_LIMIT {
            self.entries
                .iter()
                .position(|entry| entry.key() >= key)
                .unwrap_or(self.entries.len())
        } else {
            self.entries.partition_point(|entry| entry.key() < key)
        }
    }

    /// Index of the last entry whose key is strictly below `key`, or 0.
    ///
    /// Following this entry in every index chunk reaches the leaf that holds
    /// the lower bound of `key`, or the leaf right before it.
    #[must_use]
    pub fn route(&self, key: u32) -> usize {
        self.locate(key).saturating_sub(1)
    }

    /// Shifts the entries from `position` on and inserts `entry` there.
    /// Returns whether the chunk now exceeds its capacity.
    pub fn insert_at(&mut self, position: usize, entry: E) -> bool {
        self.entries.insert(position, entry);
        self.entries.len() > self.capacity
    }

    /// Moves the upper half of the entries into a new chunk that takes over
    /// this chunk's sibling link. Returns the new chunk and its first key.
    ///
    /// The caller stores the new chunk and points `next` at it.
    #[must_use]
    pub fn split(&mut self) -> (Chunk<E>, u32) {
        let right = self.entries.split_off(self.entries.len() / 2);
        let separator = right[0].key();
        let mut sibling = Chunk::from_entries(right, self.capacity);
        sibling.next = self.next;
        (sibling, separator)
    }
}
