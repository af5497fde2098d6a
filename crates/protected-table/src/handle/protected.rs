//! Handle over a stored field.

use std::cell::Cell;
use std::fmt;

use super::{OverrideState, bound_table};
use crate::error::{TableError, fatal};
use crate::link::{Binding, Link};
use crate::path::{FieldPath, PathId};
use crate::table::{ProtectedTable, SuperIndex};

/// Accessor for one stored field of `R`.
///
/// `set` and `override_with` need a writable path; a read-only path makes
/// this a get-only handle. [`Protected::override_only`] keeps override but
/// refuses `set`.
pub struct Protected<R, V> {
    path: FieldPath<R, V>,
    binding: Binding<R>,
    state: Cell<OverrideState>,
    settable: bool,
}

impl<R: 'static, V: Clone + 'static> Protected<R, V> {
    pub fn new(path: FieldPath<R, V>) -> Self {
        Self {
            path,
            binding: Binding::new(),
            state: Cell::new(OverrideState::Unoverridden),
            settable: true,
        }
    }

    /// Handle that can override the field but not set it.
    pub fn override_only(path: FieldPath<R, V>) -> Self {
        Self {
            settable: false,
            ..Self::new(path)
        }
    }

    #[track_caller]
    fn table(&self) -> ProtectedTable<R> {
        bound_table(&self.binding, self.path.id())
    }

    pub fn get(&self) -> V {
        self.table().read(&self.path)
    }

    #[track_caller]
    pub fn set(&self, value: V) {
        if !self.settable {
            fatal(TableError::ReadOnlyPath {
                path: self.path.id(),
            });
        }
        self.table().write(&self.path, value);
    }

    /// Replace the field, keeping the old value reachable as the super value.
    ///
    /// Only the first call has an effect. Every call returns the index
    /// captured by that first call.
    pub fn override_with(&self, value: V) -> SuperIndex {
        if let OverrideState::Overridden(index) = self.state.get() {
            log::debug!("`{}` already overridden, ignoring", self.path.id());
            return index;
        }

        let index = self.table().override_with(&self.path, value);
        self.state.set(OverrideState::Overridden(index));
        index
    }

    /// The value this handle's override replaced, or `get()` before any
    /// override.
    pub fn super_value(&self) -> V {
        match self.state.get() {
            OverrideState::Unoverridden => self.get(),
            OverrideState::Overridden(index) => self.table().overridden(&self.path, index),
        }
    }

    pub fn state(&self) -> OverrideState {
        self.state.get()
    }

    pub fn is_settable(&self) -> bool {
        self.settable && self.path.is_writable()
    }

    pub fn path(&self) -> &FieldPath<R, V> {
        &self.path
    }

    pub fn is_linked(&self) -> bool {
        self.binding.is_linked()
    }

    pub fn is_linked_to(&self, table: &ProtectedTable<R>) -> bool {
        self.binding.is_linked_to(table)
    }
}

impl<R, V> Link<R> for Protected<R, V> {
    fn binding(&self) -> &Binding<R> {
        &self.binding
    }

    fn primary_path(&self) -> PathId {
        self.path.id()
    }
}

impl<R, V> fmt::Debug for Protected<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protected")
            .field("path", &self.path.id())
            .field("state", &self.state.get())
            .field("settable", &self.settable)
            .field("binding", &self.binding)
            .finish()
    }
}
