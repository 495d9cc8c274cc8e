use std::iter::FusedIterator;

use crate::chunk::NONE;
use crate::level::Level;

/// Position of a key in the leaf sequence: a leaf chunk slot and an offset
/// into it. Positions handed out are normalized: an offset past the end of a
/// chunk only occurs on the last leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub chunk: usize,
    pub slot: usize,
}

impl Position {
    #[must_use]
    pub fn new(chunk: usize, slot: usize) -> Self {
        Position { chunk, slot }
    }
}

impl Level<u32> {
    /// Moves a position that points past its chunk to the start of the next
    /// chunk, if there is one.
    pub(crate) fn normalize(&self, mut position: Position) -> Position {
        loop {
            let chunk = self.chunk(position.chunk);
            if position.slot < chunk.len() || chunk.next == NONE {
                return position;
            }
            position = Position::new(chunk.next, 0);
        }
    }

    pub(crate) fn key_at(&self, position: Position) -> Option<u32> {
        self.chunk(position.chunk).entries.get(position.slot).copied()
    }

    /// Walks forward from `start` to the first key greater than `high`.
    /// Returns that boundary and the position of the last key `<= high` met
    /// on the way.
    pub(crate) fn scan(&self, start: Position, high: u32) -> (Position, Option<Position>) {
        let mut current = start;
        let mut last = None;
        loop {
            let chunk = self.chunk(current.chunk);
            match chunk.last_key() {
                // The whole remainder of the chunk qualifies
                Some(key) if key <= high && chunk.next != NONE => {
                    last = Some(Position::new(current.chunk, chunk.len() - 1));
                    current = Position::new(chunk.next, 0);
                }
                _ => {
                    let boundary = chunk.entries[current.slot..]
                        .iter()
                        .position(|&key| key > high)
                        .map_or(chunk.len(), |offset| current.slot + offset);
                    if boundary > current.slot {
                        last = Some(Position::new(current.chunk, boundary - 1));
                    }
                    return (self.normalize(Position::new(current.chunk, boundary)), last);
                }
            }
        }
    }
}

/// Keys `low..=high` of a [`SkipList`](crate::SkipList) as a half-open pair
/// of leaf positions `[start, end)`.
///
/// The range borrows the list, so it cannot outlive the next insertion.
#[derive(Clone, Copy, Debug)]
pub struct Range<'a> {
    leaves: &'a Level<u32>,
    start: Position,
    end: Position,
    last: Option<Position>,
}

impl<'a> Range<'a> {
    pub(crate) fn new(
        leaves: &'a Level<u32>,
        start: Position,
        end: Position,
        last: Option<Position>,
    ) -> Self {
        Range {
            leaves,
            start,
            end,
            last,
        }
    }

    /// Position of the first key in the range. Equals [`Range::end`] when
    /// the range is empty.
    #[must_use]
    pub fn start(&self) -> Position {
        self.start
    }

    /// Position just past the last key in the range.
    #[must_use]
    pub fn end(&self) -> Position {
        self.end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest key in the range.
    #[must_use]
    pub fn first(&self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        self.leaves.key_at(self.start)
    }

    /// Largest key in the range.
    #[must_use]
    pub fn last(&self) -> Option<u32> {
        self.last.and_then(|position| self.leaves.key_at(position))
    }

    /// Number of keys in the range; walks the leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'a> {
        Iter::new(self.leaves, self.start, Some(self.end))
    }
}

impl<'a> IntoIterator for Range<'a> {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Ascending iterator over leaf keys, following the sibling links.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    leaves: &'a Level<u32>,
    current: Position,
    end: Option<Position>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(leaves: &'a Level<u32>, start: Position, end: Option<Position>) -> Self {
        Iter {
            leaves,
            current: start,
            end,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if Some(self.current) == self.end || self.leaves.is_empty() {
            return None;
        }
        let key = self.leaves.key_at(self.current)?;
        self.current = self
            .leaves
            .normalize(Position::new(self.current.chunk, self.current.slot + 1));
        Some(key)
    }
}

impl<'a> FusedIterator for Iter<'a> {}
