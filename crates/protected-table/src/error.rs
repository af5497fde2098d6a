//! Precondition violations raised by the table and its handles.
//!
//! Every variant is a programmer error. The checked `try_*` methods return
//! them; the plain methods hand them to [`fatal`].

use thiserror::Error;

use crate::path::PathId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("handle for `{path}` used before it was linked to a table")]
    Unlinked { path: PathId },

    #[error("handle for `{path}` outlived its table")]
    TableDropped { path: PathId },

    #[error("handle for `{path}` is already linked to a different table")]
    AlreadyLinked { path: PathId },

    #[error("no override stack exists for `{path}`")]
    MissingStack { path: PathId },

    #[error("super index {index} out of range for `{path}` (stack depth {depth})")]
    IndexOutOfRange {
        path: PathId,
        index: usize,
        depth: usize,
    },

    #[error("override stack for `{path}` does not hold `{expected}` values")]
    TypeMismatch {
        path: PathId,
        expected: &'static str,
    },

    #[error("`{path}` was never declared by a handle linked to this table")]
    ForeignPath { path: PathId },

    #[error("`{path}` is read-only")]
    ReadOnlyPath { path: PathId },
}

impl TableError {
    pub fn path(&self) -> PathId {
        match self {
            TableError::Unlinked { path }
            | TableError::TableDropped { path }
            | TableError::AlreadyLinked { path }
            | TableError::MissingStack { path }
            | TableError::IndexOutOfRange { path, .. }
            | TableError::TypeMismatch { path, .. }
            | TableError::ForeignPath { path }
            | TableError::ReadOnlyPath { path } => *path,
        }
    }
}

/// Crash-fast exit for a violated precondition.
#[cold]
#[track_caller]
pub(crate) fn fatal(error: TableError) -> ! {
    log::error!("protected table precondition violated: {error}");
    panic!("{error}")
}
