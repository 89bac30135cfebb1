//! Logical database identifier type.

use std::fmt;

/// Identifies one logical database of the keyspace.
///
/// Using `usize` because databases are stored in a `Vec` and the evictor
/// walks them by index.
///
/// # Example
/// ```
/// use maxmem::DbId;
///
/// let db = DbId::new(3);
/// assert_eq!(db.0, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DbId(pub usize);

impl DbId {
    /// Create a new DbId.
    #[inline]
    pub fn new(id: usize) -> Self {
        DbId(id)
    }
}

impl fmt::Display for DbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db{}", self.0)
    }
}
