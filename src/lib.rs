//! Cache-sensitive skip list: a sorted in-memory index over `u32` keys built
//! from fixed-capacity chunks and a fixed number of deterministically sampled
//! index levels.
//!
//! ```
//! use cssl::SkipList;
//!
//! let mut list = SkipList::new(3, 4).expect("Invalid config");
//! for key in 1..=20 {
//!     list.insert(key).expect("Capacity exceeded");
//! }
//! assert_eq!(list.search(10), Some(10));
//! assert_eq!(list.search(21), None);
//!
//! let range = list.search_range(5, 15).expect("Invalid range");
//! assert_eq!(range.iter().collect::<Vec<_>>(), (5..=15).collect::<Vec<_>>());
//! ```

mod chunk;
mod config;
mod error;
mod level;
mod range;
mod skiplist;

pub use config::Config;
pub use error::{Error, Result};
pub use level::LevelStats;
pub use range::{Iter, Position, Range};
pub use skiplist::SkipList;
