//! Handles: bounded accessors that forward to the owner's table.
//!
//! A handle never stores a value of its own. Override-capable handles
//! carry an explicit [`OverrideState`] per underlying path.

mod computed;
mod protected;

pub use computed::Computed;
pub use protected::Protected;

use crate::error::{TableError, fatal};
use crate::link::Binding;
use crate::path::PathId;
use crate::table::{ProtectedTable, SuperIndex};

/// Override progress of one handle path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverrideState {
    #[default]
    Unoverridden,
    /// Terminal: later overrides leave the captured index in place.
    Overridden(SuperIndex),
}

impl OverrideState {
    pub fn super_index(self) -> Option<SuperIndex> {
        match self {
            OverrideState::Unoverridden => None,
            OverrideState::Overridden(index) => Some(index),
        }
    }

    pub fn is_overridden(self) -> bool {
        matches!(self, OverrideState::Overridden(_))
    }
}

/// Resolve a handle's table or crash.
#[track_caller]
fn bound_table<R: 'static>(binding: &Binding<R>, path: PathId) -> ProtectedTable<R> {
    binding
        .table(path)
        .unwrap_or_else(|error: TableError| fatal(error))
}
