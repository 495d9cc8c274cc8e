use conv::ValueFrom;
use tracing::{debug, warn};

use crate::{
    chunk::{Link, Split},
    config::Config,
    error::{Error, Result},
    level::{Level, LevelStats},
    range::{Iter, Position, Range},
};

/// Cache-sensitive skip list over `u32` keys.
///
/// Level 0 holds every key in linked, fixed-capacity chunks. Each level above
/// holds the first key of every chunk one level below, together with the slot
/// of that chunk, so separators are sampled deterministically every
/// `skip_value` to `2 * skip_value - 1` keys. The number of levels is fixed at
/// creation and never grows past `level_count`.
#[derive(Clone, Debug)]
pub struct SkipList {
    config: Config,
    len: usize,
    leaves: Level<u32>,
    // Level `h` lives at `index[h - 1]`.
    index: Vec<Level<Link>>,
}

impl SkipList {
    /// Creates an empty skip list with `level_count` levels (leaf level
    /// included) and a fan-out of `skip_value`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `level_count` is 0 or `skip_value` is
    /// below 2.
    pub fn new(level_count: usize, skip_value: usize) -> Result<Self> {
        Config::new(level_count, skip_value).map(Self::with_config)
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let capacity = config.capacity();
        let mut leaves = Level::new(0, capacity);
        leaves.push_empty();
        let index = (1..config.level_count())
            .map(|height| Level::new(height, capacity))
            .collect();

        debug!(
            level_count = config.level_count(),
            skip_value = config.skip_value(),
            capacity,
            "created skip list"
        );
        SkipList {
            config,
            len: 0,
            leaves,
            index,
        }
    }

    #[must_use]
    pub fn config(&self) -> Config {
        self.config
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.config.level_count()
    }

    #[must_use]
    pub fn skip_value(&self) -> usize {
        self.config.skip_value()
    }

    /// Number of keys stored, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of populated levels, between 1 and `level_count`.
    #[must_use]
    pub fn height(&self) -> usize {
        1 + self.index.iter().take_while(|level| !level.is_empty()).count()
    }

    /// Returns `key` if it is stored, `None` otherwise.
    #[must_use]
    pub fn search(&self, key: u32) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let position = self.lower_bound(key);
        self.leaves.key_at(position).filter(|&found| found == key)
    }

    #[must_use]
    pub fn contains(&self, key: u32) -> bool {
        self.search(key).is_some()
    }

    /// Every stored key `k` with `low <= k <= high`, in ascending order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] when `low > high`.
    pub fn search_range(&self, low: u32, high: u32) -> Result<Range<'_>> {
        if low > high {
            return Err(Error::InvalidRange { low, high });
        }
        if self.is_empty() {
            let empty = Position::default();
            return Ok(Range::new(&self.leaves, empty, empty, None));
        }
        let start = self.lower_bound(low);
        let (end, last) = self.leaves.scan(start, high);
        Ok(Range::new(&self.leaves, start, end, last))
    }

    /// Inserts `key`, next to any equal keys already stored.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExceeded`] when the insertion would split the top
    /// chunk of the highest configured level. The list is left untouched.
    pub fn insert(&mut self, key: u32) -> Result<()> {
        // Record the (height, chunk, position) visited at each index level
        let mut path = Vec::with_capacity(self.index.len());
        let leaf = self.descend(key, |height, chunk, position| {
            path.push((height, chunk, position));
        });

        // Find how far the split cascade reaches before touching anything
        let splits = self.count_splits(leaf, &path);
        if splits == self.level_count() {
            warn!(
                key,
                level_count = self.level_count(),
                "insertion rejected: top level is full"
            );
            return Err(Error::CapacityExceeded {
                level_count: self.level_count(),
            });
        }

        if self.leaves.chunk(0).first_key().map_or(false, |min| key < min) {
            self.lower_leftmost_separators(key);
        }

        // Insert into the leaf
        let chunk = self.leaves.chunk_mut(leaf);
        let position = chunk.locate(key);
        let overflow = chunk.insert_at(position, key);
        self.len += 1;
        if !overflow {
            return Ok(());
        }

        // Propagate separators upwards while chunks keep overflowing
        let mut split = self.leaves.split(leaf);
        for &(height, chunk, position) in path.iter().rev() {
            let level = &mut self.index[height - 1];
            let link = Link::new(split.separator, split.right);
            if !level.chunk_mut(chunk).insert_at(position + 1, link) {
                return Ok(());
            }
            split = level.split(chunk);
        }

        // The root split, so the next level up gets its first chunk
        self.grow(path.len() + 1, split);
        Ok(())
    }

    /// In-order iterator over every stored key.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        let start = self.leaves.normalize(Position::default());
        Iter::new(&self.leaves, start, None)
    }

    /// Separator count deterministic sampling aims for at `height`:
    /// `len / skip_value^height`.
    #[must_use]
    pub fn expected_separators(&self, height: usize) -> usize {
        u32::value_from(height)
            .ok()
            .and_then(|exponent| self.skip_value().checked_pow(exponent))
            .map_or(0, |divisor| self.len / divisor)
    }

    /// Occupancy of every configured level, leaf level first.
    #[must_use]
    pub fn level_stats(&self) -> Vec<LevelStats> {
        let mut stats = vec![self.leaves.stats(self.len)];
        for level in &self.index {
            stats.push(level.stats(self.expected_separators(level.height)));
        }
        stats
    }

    /// Walks every level and verifies ordering, capacities, sibling links and
    /// that each separator is the first key of the chunk it links to.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupted`] describing the first violation found.
    pub fn check_invariants(&self) -> Result<()> {
        let corrupted = |message: String| Err(Error::Corrupted(message));

        // Leaf level: sorted across chunks and no chunk over capacity
        let leaf_order = self.leaves.slots().collect::<Vec<_>>();
        if leaf_order.len() != self.leaves.num_chunks() {
            return corrupted(format!(
                "{} of {} leaf chunks reachable",
                leaf_order.len(),
                self.leaves.num_chunks()
            ));
        }
        let mut previous = None;
        for &slot in &leaf_order {
            let chunk = self.leaves.chunk(slot);
            if chunk.len() > chunk.capacity() || (chunk.is_empty() && !self.is_empty()) {
                return corrupted(format!("leaf chunk {slot} holds {} keys", chunk.len()));
            }
            for &key in &chunk.entries {
                if previous.map_or(false, |previous| previous > key) {
                    return corrupted(format!("leaf chunk {slot} out of order at key {key}"));
                }
                previous = Some(key);
            }
        }
        if self.leaves.num_entries() != self.len {
            return corrupted(format!(
                "{} keys stored, {} counted",
                self.leaves.num_entries(),
                self.len
            ));
        }

        // Index levels: one link per chunk below, in the same order
        let height = self.height();
        let mut below = leaf_order;
        for level in &self.index[..height - 1] {
            let order = level.slots().collect::<Vec<_>>();
            let mut children = Vec::with_capacity(below.len());
            let mut previous = None;
            for &slot in &order {
                let chunk = level.chunk(slot);
                if chunk.is_empty() || chunk.len() > chunk.capacity() {
                    return corrupted(format!(
                        "chunk {slot} at height {} holds {} links",
                        level.height,
                        chunk.len()
                    ));
                }
                for link in &chunk.entries {
                    if previous.map_or(false, |previous| previous > link.key) {
                        return corrupted(format!(
                            "separator {} out of order at height {}",
                            link.key, level.height
                        ));
                    }
                    previous = Some(link.key);
                    if self.first_key_below(level.height, link.child) != Some(link.key) {
                        return corrupted(format!(
                            "separator {} at height {} is not the first key of chunk {}",
                            link.key, level.height, link.child
                        ));
                    }
                    children.push(link.child);
                }
            }
            if children != below {
                return corrupted(format!(
                    "links at height {} do not match the chunks below",
                    level.height
                ));
            }
            below = order;
        }

        if below.len() != 1 {
            return corrupted(format!("{} root chunks", below.len()));
        }
        if let Some(level) = self.index[height - 1..].iter().find(|level| !level.is_empty()) {
            return corrupted(format!("level {} populated above the root", level.height));
        }
        Ok(())
    }

    // Descend from the root to the leaf that holds the lower bound of `key`
    // or the leaf right before it. `visit` sees every index chunk on the way.
    fn descend<F>(&self, key: u32, mut visit: F) -> usize
    where
        F: FnMut(usize, usize, usize),
    {
        let mut slot = 0;
        for height in (1..self.height()).rev() {
            let chunk = self.index[height - 1].chunk(slot);
            let position = chunk.route(key);
            visit(height, slot, position);
            slot = chunk.entries[position].child;
        }
        slot
    }

    fn lower_bound(&self, key: u32) -> Position {
        let leaf = self.descend(key, |_, _, _| {});
        let slot = self.leaves.chunk(leaf).locate(key);
        self.leaves.normalize(Position::new(leaf, slot))
    }

    // Number of levels that split when `key` goes into `leaf`.
    fn count_splits(&self, leaf: usize, path: &[(usize, usize, usize)]) -> usize {
        if !self.leaves.chunk(leaf).is_full() {
            return 0;
        }
        let mut splits = 1;
        for &(height, chunk, _) in path.iter().rev() {
            if !self.index[height - 1].chunk(chunk).is_full() {
                break;
            }
            splits += 1;
        }
        splits
    }

    // A new minimum becomes the first separator along the leftmost path.
    fn lower_leftmost_separators(&mut self, key: u32) {
        let height = self.height();
        for level in &mut self.index[..height - 1] {
            level.chunk_mut(0).entries[0].key = key;
        }
    }

    fn grow(&mut self, height: usize, split: Split) {
        let level = &mut self.index[height - 1];
        let root = level.push_empty();
        let links = &mut level.chunk_mut(root).entries;
        links.push(Link::new(split.left_key, 0));
        links.push(Link::new(split.separator, split.right));

        debug!(height, len = self.len, "populated new root level");
    }

    fn first_key_below(&self, height: usize, child: usize) -> Option<u32> {
        if height == 1 {
            self.leaves.chunk(child).first_key()
        } else {
            self.index[height - 2].chunk(child).first_key()
        }
    }
}

impl Default for SkipList {
    fn default() -> Self {
        SkipList::with_config(Config::default())
    }
}

impl<'a> IntoIterator for &'a SkipList {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::SkipList;
    use crate::{Config, Error};

    fn keys(list: &SkipList) -> Vec<u32> {
        list.iter().collect()
    }

    #[test]
    fn empty() {
        let list = SkipList::default();
        assert_eq!(list.height(), 1);
        assert_eq!(list.search(0), None);
        assert_eq!(list.search(u32::MAX), None);
        assert!(list.search_range(0, u32::MAX).unwrap().is_empty());
        assert_eq!(list.iter().next(), None);
        list.check_invariants().unwrap();
    }

    #[test]
    fn invalid_config() {
        assert!(matches!(
            SkipList::new(0, 4),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            SkipList::new(4, 1),
            Err(Error::InvalidConfig { .. })
        ));
        assert_eq!(SkipList::default().config(), Config::default());
    }

    #[test]
    fn ascending() {
        let mut list = SkipList::new(3, 4).expect("Invalid config");
        for key in 1..=20 {
            list.insert(key).unwrap();
            list.check_invariants().unwrap();
        }
        assert_eq!(list.len(), 20);
        assert_eq!(list.height(), 2);

        assert_eq!(list.search(10), Some(10));
        assert_eq!(list.search(21), None);
        assert_eq!(list.search(0), None);

        let range = list.search_range(5, 15).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), (5..=15).collect::<Vec<_>>());
        assert_eq!(range.first(), Some(5));
        assert_eq!(range.last(), Some(15));
        assert_eq!(range.len(), 11);

        let range = list.search_range(25, 30).unwrap();
        assert!(range.is_empty());
        assert_eq!(range.first(), None);
        assert_eq!(range.last(), None);

        assert_eq!(
            list.search_range(15, 5).err(),
            Some(Error::InvalidRange { low: 15, high: 5 })
        );
    }

    #[test]
    fn duplicates() {
        let mut list = SkipList::new(3, 2).expect("Invalid config");
        list.insert(7).unwrap();
        list.insert(7).unwrap();
        assert_eq!(list.search(7), Some(7));
        assert_eq!(keys(&list), vec![7, 7]);

        // Enough copies to spread the same key over several chunks
        for _ in 0..8 {
            list.insert(7).unwrap();
        }
        list.insert(3).unwrap();
        list.insert(9).unwrap();
        list.check_invariants().unwrap();

        assert_eq!(list.search(7), Some(7));
        let range = list.search_range(7, 7).unwrap();
        assert_eq!(range.len(), 10);
        assert_eq!(range.first(), Some(7));
        assert_eq!(range.last(), Some(7));
        assert_eq!(list.search_range(4, 8).unwrap().len(), 10);
        assert_eq!(list.search_range(8, 9).unwrap().first(), Some(9));
    }

    #[test]
    fn new_minimum() {
        let mut list = SkipList::new(4, 2).expect("Invalid config");
        for key in (10..30).rev() {
            list.insert(key).unwrap();
            list.check_invariants().unwrap();
            assert_eq!(list.search(key), Some(key));
        }
        assert_eq!(list.search_range(0, 10).unwrap().first(), Some(10));
        assert_eq!(keys(&list), (10..30).collect::<Vec<_>>());
    }

    #[test]
    fn capacity_exceeded() {
        // Two levels of capacity 3: the root fills up after seven ascending keys
        let mut list = SkipList::new(2, 2).expect("Invalid config");
        for key in 1..=7 {
            list.insert(key).unwrap();
        }
        assert_eq!(list.height(), 2);

        let before = keys(&list);
        assert_eq!(
            list.insert(8),
            Err(Error::CapacityExceeded { level_count: 2 })
        );
        assert_eq!(keys(&list), before);
        assert_eq!(list.len(), 7);
        assert_eq!(list.search(8), None);
        list.check_invariants().unwrap();
        for key in 1..=7 {
            assert_eq!(list.search(key), Some(key));
        }

        // A key landing in a leaf with room still fits
        list.insert(0).unwrap();
        assert_eq!(list.search(0), Some(0));
        list.check_invariants().unwrap();
    }

    #[test]
    fn single_level() {
        let mut list = SkipList::new(1, 2).expect("Invalid config");
        for key in [5, 1, 3] {
            list.insert(key).unwrap();
        }
        assert!(matches!(
            list.insert(4),
            Err(Error::CapacityExceeded { level_count: 1 })
        ));
        assert_eq!(keys(&list), vec![1, 3, 5]);
        assert_eq!(list.height(), 1);
    }

    #[test]
    fn level_stats() {
        let mut list = SkipList::new(4, 3).expect("Invalid config");
        for key in 0..200 {
            list.insert(key * 3).unwrap();
        }
        let stats = list.level_stats();
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[0].entries, 200);
        assert_eq!(stats[0].capacity, 5);
        assert_eq!(stats[1].entries, stats[0].chunks);
        assert_eq!(stats[1].expected_entries, 200 / 3);
        assert_eq!(stats[2].expected_entries, 200 / 9);
        for level in &stats {
            assert!(level.fill_factor <= 1.0);
        }
        assert_eq!(list.expected_separators(64), 0);
    }
}
