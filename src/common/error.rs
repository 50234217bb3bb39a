//! Error types for FleetDB.

use thiserror::Error;

use crate::common::EntityKind;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in FleetDB.
///
/// One error type is shared by the heap store, both tree types, the page
/// cache and the index facade. A lookup that finds nothing is not an error:
/// those operations return `Ok(None)` or an empty vector.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a file read, write or sync.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted before the structure was created or opened.
    #[error("{0} is not open")]
    NotOpen(&'static str),

    /// Every slot of a heap table is live.
    #[error("{kind} table is full ({capacity} slots)")]
    SlotExhausted { kind: EntityKind, capacity: u32 },

    /// A write targeted a record that does not exist.
    #[error("{kind} record {id} not found")]
    RecordNotFound { kind: EntityKind, id: u64 },

    /// A record that cannot be stored: id 0 or already marked deleted.
    #[error("invalid {kind} record: {reason}")]
    InvalidRecord {
        kind: EntityKind,
        reason: &'static str,
    },

    /// Bad magic tag, checksum mismatch or a structurally invalid page.
    #[error("corrupt file: {0}")]
    CorruptFile(String),

    /// Requested page does not exist on disk.
    #[error("page {0} not found")]
    PageNotFound(u32),

    /// Page cache has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("no free frames available in page cache")]
    NoFreeFrames,

    /// Attempted to drop a page from the cache while it is pinned.
    #[error("page {0} is still pinned")]
    PagePinned(u32),

    /// One of the index facade's sub-structures failed; names which one.
    #[error("{index} index failed: {source}")]
    IndexFailure {
        index: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wrap `self` as the failure of the named index.
    pub(crate) fn in_index(self, index: &'static str) -> Self {
        Error::IndexFailure {
            index,
            source: Box::new(self),
        }
    }

    /// Shorthand for `Error::CorruptFile`.
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptFile(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "page 42 not found");

        let err = Error::SlotExhausted {
            kind: EntityKind::Trip,
            capacity: 5,
        };
        assert_eq!(format!("{}", err), "trip table is full (5 slots)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_index_failure_names_sub_structure() {
        let err = Error::corrupt("bad magic").in_index("driver_email");

        assert_eq!(
            format!("{}", err),
            "driver_email index failed: corrupt file: bad magic"
        );
        assert!(matches!(
            err.source().and_then(|s| s.downcast_ref::<Error>()),
            Some(Error::CorruptFile(_))
        ));
    }
}
