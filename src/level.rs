use conv::ValueFrom;
use tracing::trace;

use crate::chunk::{Chunk, Entry, Split, NONE};

/// Arena of the chunks at one height. Chunks are addressed by slot and never
/// freed; slot 0 is always the leftmost chunk of a populated level.
#[derive(Clone, Debug)]
pub struct Level<E> {
    pub height: usize,
    capacity: usize,
    chunks: Vec<Chunk<E>>,
}

impl<E: Entry> Level<E> {
    #[must_use]
    pub fn new(height: usize, capacity: usize) -> Self {
        Level {
            height,
            capacity,
            chunks: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of entries over all chunks of the level.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    #[must_use]
    pub fn chunk(&self, slot: usize) -> &Chunk<E> {
        &self.chunks[slot]
    }

    pub fn chunk_mut(&mut self, slot: usize) -> &mut Chunk<E> {
        &mut self.chunks[slot]
    }

    // Allocate a slot for the chunk.
    pub fn push(&mut self, chunk: Chunk<E>) -> usize {
        let slot = self.chunks.len();
        self.chunks.push(chunk);
        slot
    }

    /// Allocates an empty chunk sized for this level.
    pub fn push_empty(&mut self) -> usize {
        self.push(Chunk::new(self.capacity))
    }

    /// Splits the chunk at `slot` and links the new right half in after it.
    pub fn split(&mut self, slot: usize) -> Split {
        let (sibling, separator) = self.chunks[slot].split();
        let right = self.push(sibling);
        let left = &mut self.chunks[slot];
        left.next = right;
        let left_key = left.entries[0].key();

        trace!(
            height = self.height,
            left = slot,
            right,
            separator,
            "split chunk"
        );
        Split {
            left_key,
            right,
            separator,
        }
    }

    /// Chunk slots in key order, following the sibling links from slot 0.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        let head = (!self.chunks.is_empty()).then_some(0);
        std::iter::successors(head, move |&slot| {
            let next = self.chunks[slot].next;
            (next != NONE).then_some(next)
        })
    }

    #[must_use]
    pub fn stats(&self, expected_entries: usize) -> LevelStats {
        let chunks = self.num_chunks();
        let entries = self.num_entries();
        let slots = chunks.saturating_mul(self.capacity);
        let fill_factor = if slots == 0 {
            0.0
        } else {
            ratio(entries) / ratio(slots)
        };
        LevelStats {
            height: self.height,
            chunks,
            entries,
            capacity: self.capacity,
            expected_entries,
            fill_factor,
        }
    }
}

fn ratio(count: usize) -> f64 {
    f64::value_from(count).unwrap_or(f64::MAX)
}

/// Occupancy summary of one level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelStats {
    /// 0 for the leaf level.
    pub height: usize,
    pub chunks: usize,
    pub entries: usize,
    /// Entries per chunk before it splits.
    pub capacity: usize,
    /// `len / skip_value^height`: the separator count deterministic sampling
    /// aims for at this height.
    pub expected_entries: usize,
    /// Share of the allocated chunk slots in use, in `[0, 1]`.
    pub fill_factor: f64,
}

#[cfg(test)]
mod tests {
    use super::Level;
    use crate::chunk::{Chunk, NONE};

    #[test]
    fn split_links_siblings() {
        let mut level: Level<u32> = Level::new(0, 3);
        let first = level.push(Chunk::from_entries(vec![1, 2, 3, 4], 3));
        let split = level.split(first);

        assert_eq!(split.left_key, 1);
        assert_eq!(split.separator, 3);
        assert_eq!(level.chunk(first).next, split.right);
        assert_eq!(level.chunk(split.right).next, NONE);

        // Splitting the left chunk again puts the new chunk between the two
        level.chunk_mut(first).entries = vec![1, 2, 2, 2];
        let middle = level.split(first);
        assert_eq!(level.slots().collect::<Vec<_>>(), vec![0, middle.right, split.right]);
        assert_eq!(level.num_entries(), 6);
    }

    #[test]
    fn stats() {
        let mut level: Level<u32> = Level::new(1, 4);
        let empty = level.stats(0);
        assert_eq!(empty.chunks, 0);
        assert_eq!(empty.fill_factor, 0.0);
        assert_eq!(level.slots().count(), 0);

        level.push(Chunk::from_entries(vec![1, 2], 4));
        level.push_empty();
        let stats = level.stats(3);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.expected_entries, 3);
        assert_eq!(stats.fill_factor, 0.25);
    }
}
