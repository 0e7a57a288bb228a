use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Insert found an equal key; the tree was not modified.
    #[error("key already present")]
    DuplicateKey,
    /// The key is not in the tree; the tree was not modified.
    #[error("key not found")]
    KeyNotFound,
    /// The allocator refused to hand out a node.
    #[error("node allocation failed")]
    CapacityExceeded,
}
