//! Construction errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// A table needs at least one slot to hash into.
    #[error("slot count must be greater than zero")]
    ZeroSlots,
}
