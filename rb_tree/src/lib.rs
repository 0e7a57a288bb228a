//! An ordered map built on a red-black tree with a shared sentinel leaf,
//! a pluggable key order and a pluggable node allocator.
//!
//! ```
//! use rb_tree::{RedBlackTree, TreeError};
//!
//! let mut tree = RedBlackTree::new();
//! for it in [10, 20, 30] {
//!     tree.insert(it, it * 2).unwrap();
//! }
//!
//! assert_eq!(tree.get(&20), Some((&20, &40)));
//! assert_eq!(tree.delete(&20), Ok((20, 40)));
//! assert_eq!(tree.delete(&20), Err(TreeError::KeyNotFound));
//! assert!(tree.iter().map(|(k, _)| *k).eq([10, 30]));
//! ```

#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod bounded;
pub mod compare;
mod error;
mod iter;
#[cfg(test)]
mod metrics;
mod node;
mod red_black_tree;

pub use bounded::BoundedAlloc;
pub use compare::{Comparator, FnComparator, NaturalOrder, ReverseOrder};
pub use error::TreeError;
pub use iter::{Cursor, Iter};
pub use red_black_tree::{Pretty, RedBlackTree};
