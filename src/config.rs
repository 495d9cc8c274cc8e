use crate::error::{Error, Result};

/// Shape of a [`SkipList`](crate::SkipList), fixed for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    level_count: usize,
    skip_value: usize,
}

impl Config {
    pub const DEFAULT_LEVEL_COUNT: usize = 9;
    pub const DEFAULT_SKIP_VALUE: usize = 5;

    /// `level_count` is the number of levels including the leaf level,
    /// `skip_value` the fan-out from one level to the next.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `level_count` is 0 or `skip_value` is
    /// below 2.
    pub fn new(level_count: usize, skip_value: usize) -> Result<Self> {
        if level_count == 0 || skip_value < 2 {
            return Err(Error::InvalidConfig {
                level_count,
                skip_value,
            });
        }
        Ok(Config {
            level_count,
            skip_value,
        })
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.level_count
    }

    #[must_use]
    pub fn skip_value(&self) -> usize {
        self.skip_value
    }

    /// Entries a chunk holds before it splits. A split of an overflowing
    /// chunk leaves two chunks of exactly `skip_value` entries, so every
    /// `skip_value`-th key on average is sampled into the level above.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.skip_value.saturating_mul(2) - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            level_count: Self::DEFAULT_LEVEL_COUNT,
            skip_value: Self::DEFAULT_SKIP_VALUE,
        }
    }
}
