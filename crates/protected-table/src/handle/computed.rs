//! Handle over a computed getter/setter pair.
//!
//! The root stores the accessor closures themselves. Getter and setter are
//! separate paths with separate override stacks, so each keeps its own
//! override state.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use smallvec::{SmallVec, smallvec};

use super::{OverrideState, bound_table};
use crate::error::{TableError, fatal};
use crate::link::{Binding, Link};
use crate::path::{FieldPath, Getter, PathId, Setter};
use crate::table::{ProtectedTable, SuperIndex};

pub struct Computed<R, V> {
    get_path: FieldPath<R, Getter<V>>,
    set_path: Option<FieldPath<R, Setter<V>>>,
    binding: Binding<R>,
    get_state: Cell<OverrideState>,
    set_state: Cell<OverrideState>,
}

impl<R: 'static, V: 'static> Computed<R, V> {
    pub fn new(get_path: FieldPath<R, Getter<V>>, set_path: FieldPath<R, Setter<V>>) -> Self {
        Self {
            get_path,
            set_path: Some(set_path),
            binding: Binding::new(),
            get_state: Cell::new(OverrideState::Unoverridden),
            set_state: Cell::new(OverrideState::Unoverridden),
        }
    }

    /// Get-only computed handle.
    pub fn getter(get_path: FieldPath<R, Getter<V>>) -> Self {
        Self {
            get_path,
            set_path: None,
            binding: Binding::new(),
            get_state: Cell::new(OverrideState::Unoverridden),
            set_state: Cell::new(OverrideState::Unoverridden),
        }
    }

    #[track_caller]
    fn table(&self) -> ProtectedTable<R> {
        bound_table(&self.binding, self.get_path.id())
    }

    #[track_caller]
    fn set_path(&self) -> &FieldPath<R, Setter<V>> {
        match &self.set_path {
            Some(path) => path,
            None => fatal(TableError::ReadOnlyPath {
                path: self.get_path.id(),
            }),
        }
    }

    // NOTE: Accessors are cloned out of the table before they run, so the
    // table is not borrowed while user code executes.

    pub fn get(&self) -> V {
        let getter = self.table().read(&self.get_path);
        getter()
    }

    pub fn set(&self, value: V) {
        let setter = self.table().read(self.set_path());
        setter(value);
    }

    /// Override both accessors. Each side only takes effect on its first
    /// override; the returned pair is the (getter, setter) super indices.
    ///
    /// A getter-only handle, a missing table, or a read-only path fails
    /// before either side is touched.
    #[track_caller]
    pub fn override_with(
        &self,
        getter: impl Fn() -> V + 'static,
        setter: impl Fn(V) + 'static,
    ) -> (SuperIndex, SuperIndex) {
        let set_path = self.set_path();
        self.table();
        for (path, writable) in [
            (self.get_path.id(), self.get_path.is_writable()),
            (set_path.id(), set_path.is_writable()),
        ] {
            if !writable {
                fatal(TableError::ReadOnlyPath { path });
            }
        }

        let get_index = self.override_getter(getter);
        let set_index = self.override_setter(setter);
        (get_index, set_index)
    }

    pub fn override_getter(&self, getter: impl Fn() -> V + 'static) -> SuperIndex {
        if let OverrideState::Overridden(index) = self.get_state.get() {
            log::debug!("`{}` already overridden, ignoring", self.get_path.id());
            return index;
        }

        let getter: Getter<V> = Rc::new(getter);
        let index = self.table().override_with(&self.get_path, getter);
        self.get_state.set(OverrideState::Overridden(index));
        index
    }

    pub fn override_setter(&self, setter: impl Fn(V) + 'static) -> SuperIndex {
        let set_path = self.set_path();
        if let OverrideState::Overridden(index) = self.set_state.get() {
            log::debug!("`{}` already overridden, ignoring", set_path.id());
            return index;
        }

        let setter: Setter<V> = Rc::new(setter);
        let index = self.table().override_with(set_path, setter);
        self.set_state.set(OverrideState::Overridden(index));
        index
    }

    /// Result of the getter this handle's override replaced.
    pub fn super_value(&self) -> V {
        match self.get_state.get() {
            OverrideState::Unoverridden => self.get(),
            OverrideState::Overridden(index) => {
                let getter = self.table().overridden(&self.get_path, index);
                getter()
            }
        }
    }

    /// Invoke the setter this handle's override replaced.
    pub fn set_super(&self, value: V) {
        match self.set_state.get() {
            OverrideState::Unoverridden => self.set(value),
            OverrideState::Overridden(index) => {
                let setter = self.table().overridden(self.set_path(), index);
                setter(value);
            }
        }
    }

    pub fn get_state(&self) -> OverrideState {
        self.get_state.get()
    }

    pub fn set_state(&self) -> OverrideState {
        self.set_state.get()
    }

    pub fn is_linked(&self) -> bool {
        self.binding.is_linked()
    }

    pub fn is_linked_to(&self, table: &ProtectedTable<R>) -> bool {
        self.binding.is_linked_to(table)
    }
}

impl<R, V> Link<R> for Computed<R, V> {
    fn binding(&self) -> &Binding<R> {
        &self.binding
    }

    fn primary_path(&self) -> PathId {
        self.get_path.id()
    }

    fn paths(&self) -> SmallVec<[PathId; 2]> {
        match &self.set_path {
            Some(set_path) => smallvec![self.get_path.id(), set_path.id()],
            None => smallvec![self.get_path.id()],
        }
    }
}

impl<R, V> fmt::Debug for Computed<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("get_path", &self.get_path.id())
            .field("set_path", &self.set_path.as_ref().map(FieldPath::id))
            .field("get_state", &self.get_state.get())
            .field("set_state", &self.set_state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::field_path;

    struct Gauge {
        read: Getter<i32>,
        write: Setter<i32>,
    }

    fn gauge(stored: &Rc<Cell<i32>>) -> (Computed<Gauge, i32>, ProtectedTable<Gauge>) {
        let read_from = stored.clone();
        let write_to = stored.clone();
        let table = ProtectedTable::new(Gauge {
            read: Rc::new(move || read_from.get()),
            write: Rc::new(move |value| write_to.set(value)),
        });
        let handle = Computed::new(field_path!(Gauge, read), field_path!(Gauge, write));
        table.link(&handle);
        (handle, table)
    }

    #[test]
    fn get_and_set_invoke_stored_accessors() {
        let stored = Rc::new(Cell::new(5));
        let (handle, _table) = gauge(&stored);

        assert_eq!(handle.get(), 5);
        handle.set(9);
        assert_eq!(stored.get(), 9);
        assert_eq!(handle.get(), 9);
    }

    #[test]
    fn getter_and_setter_override_independently() {
        let stored = Rc::new(Cell::new(5));
        let (handle, _table) = gauge(&stored);

        assert_eq!(handle.override_getter(|| 7), SuperIndex(0));
        assert!(handle.get_state().is_overridden());
        assert_eq!(handle.set_state(), OverrideState::Unoverridden);

        handle.set_super(3);
        assert_eq!(stored.get(), 3);
        assert_eq!(handle.get(), 7);
        assert_eq!(handle.super_value(), 3);
    }

    #[test]
    #[should_panic(expected = "is read-only")]
    fn set_on_getter_only_handle_panics() {
        let stored = Rc::new(Cell::new(5));
        let (_, table) = gauge(&stored);
        let handle: Computed<Gauge, i32> = Computed::getter(field_path!(Gauge, read));
        table.link(&handle);

        handle.set(1);
    }

    #[test]
    fn override_on_getter_only_handle_leaves_getter_alone() {
        let stored = Rc::new(Cell::new(5));
        let (_, table) = gauge(&stored);
        let handle: Computed<Gauge, i32> = Computed::getter(field_path!(Gauge, read));
        table.link(&handle);

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| handle.override_with(|| 7, |_| {})));

        assert!(outcome.is_err());
        assert_eq!(handle.get_state(), OverrideState::Unoverridden);
        assert_eq!(table.stack_depth(field_path!(Gauge, read).id()), 0);
        assert_eq!(handle.get(), 5);
    }

    #[test]
    fn override_with_read_only_setter_leaves_getter_alone() {
        let stored = Rc::new(Cell::new(5));
        let (_, table) = gauge(&stored);
        let handle: Computed<Gauge, i32> = Computed::new(
            field_path!(Gauge, read),
            field_path!(Gauge, write, read_only),
        );
        table.link(&handle);

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| handle.override_with(|| 7, |_| {})));

        assert!(outcome.is_err());
        assert_eq!(handle.get_state(), OverrideState::Unoverridden);
        assert_eq!(table.stack_depth(field_path!(Gauge, read).id()), 0);
    }

    #[test]
    #[should_panic(expected = "used before it was linked")]
    fn unlinked_override_panics() {
        let handle: Computed<Gauge, i32> =
            Computed::new(field_path!(Gauge, read), field_path!(Gauge, write));
        handle.override_with(|| 1, |_| {});
    }

    #[test]
    #[should_panic(expected = "used before it was linked")]
    fn unlinked_set_panics() {
        let handle: Computed<Gauge, i32> =
            Computed::new(field_path!(Gauge, read), field_path!(Gauge, write));
        handle.set(1);
    }

    #[test]
    #[should_panic(expected = "outlived its table")]
    fn get_after_table_drop_panics() {
        let stored = Rc::new(Cell::new(5));
        let (handle, table) = gauge(&stored);
        drop(table);
        handle.get();
    }

    #[test]
    fn links_both_paths() {
        let stored = Rc::new(Cell::new(0));
        let (handle, table) = gauge(&stored);

        assert_eq!(handle.paths().len(), 2);
        assert!(table.is_declared(field_path!(Gauge, write).id()));
    }
}
