//! The override table: canonical storage plus per-path override stacks.
//!
//! The table owns the aggregate's only copy of its data. Overriding a field
//! pushes the value it replaces onto that field's stack, so every superseded
//! value stays reachable through the [`SuperIndex`] handed out at override
//! time. Stacks only grow.

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{TableError, fatal};
use crate::link::{self, Binding, Link, Members};
use crate::path::{FieldPath, PathId};

/// Position of one superseded value in a path's override stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuperIndex(pub usize);

impl SuperIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Type-erased override stack. Each concrete stack is a `Vec<V>`.
trait ErasedStack {
    fn depth(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<V: 'static> ErasedStack for Vec<V> {
    fn depth(&self) -> usize {
        self.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Shared state behind a table. Handles hold a `Weak` to this.
pub(crate) struct TableCell<R> {
    root: RefCell<R>,
    /// PathId → `Vec<V>` for that path's value type
    stacks: RefCell<FxHashMap<PathId, Box<dyn ErasedStack>>>,
    /// Paths declared by linked handles (or explicitly via `declare`)
    declared: RefCell<FxHashSet<PathId>>,
    /// Set by the first `solidify`
    cemented: Cell<bool>,
    linked: Cell<usize>,
}

/// Canonical storage for an aggregate `R` with override stacks per field.
///
/// The holder owns the table exclusively; handles only keep a non-owning
/// back-reference set once at link time.
pub struct ProtectedTable<R> {
    inner: Rc<TableCell<R>>,
}

impl<R: 'static> ProtectedTable<R> {
    /// Create an unlinked table over `root`.
    pub fn new(root: R) -> Self {
        Self::with_capacity(root, 0)
    }

    /// Create an unlinked table with room for `paths` override stacks.
    pub fn with_capacity(root: R, paths: usize) -> Self {
        Self {
            inner: Rc::new(TableCell {
                root: RefCell::new(root),
                stacks: RefCell::new(FxHashMap::with_capacity_and_hasher(
                    paths,
                    Default::default(),
                )),
                declared: RefCell::new(FxHashSet::with_capacity_and_hasher(
                    paths,
                    Default::default(),
                )),
                cemented: Cell::new(false),
                linked: Cell::new(0),
            }),
        }
    }

    /// Create a table over `root` and link every handle `owner` declares.
    pub fn with_owner(root: R, owner: &dyn Members<R>) -> Self {
        let table = Self::new(root);
        table.solidify(owner);
        table
    }

    pub(crate) fn from_inner(inner: Rc<TableCell<R>>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<TableCell<R>> {
        &self.inner
    }

    // --- Lifecycle ---

    /// Link every handle reachable from `owner`, across all its layers.
    ///
    /// Runs once per table; later calls are no-ops.
    pub fn solidify(&self, owner: &dyn Members<R>) {
        if let Err(error) = self.try_solidify(owner) {
            fatal(error)
        }
    }

    /// Checked [`solidify`](Self::solidify). Returns how many handles this
    /// call bound (0 when the table was already solidified).
    ///
    /// On error no handle is bound and the table stays unsolidified, so the
    /// call can be retried with a corrected owner.
    pub fn try_solidify(&self, owner: &dyn Members<R>) -> Result<usize, TableError> {
        if self.inner.cemented.get() {
            log::debug!("table already solidified, skipping link pass");
            return Ok(0);
        }

        let bound = link::link_layers(self, owner)?;
        self.inner.cemented.set(true);
        log::debug!("solidified table: {bound} handle(s) bound");
        Ok(bound)
    }

    /// Bind `handle` to this table and record the paths it declares.
    pub fn link(&self, handle: &dyn Link<R>) {
        if let Err(error) = self.try_link(handle) {
            fatal(error)
        }
    }

    /// Checked [`link`](Self::link). Returns `true` when the handle was
    /// newly bound, `false` when it was already bound here.
    pub fn try_link(&self, handle: &dyn Link<R>) -> Result<bool, TableError> {
        self.attach(handle, handle.binding())
    }

    pub(crate) fn attach(
        &self,
        handle: &dyn Link<R>,
        binding: &Binding<R>,
    ) -> Result<bool, TableError> {
        let newly_bound = binding.bind(&self.inner, handle.primary_path())?;

        self.inner.declared.borrow_mut().extend(handle.paths());
        if newly_bound {
            self.inner.linked.set(self.inner.linked.get() + 1);
            log::debug!("linked handle for `{}`", handle.primary_path());
        }
        Ok(newly_bound)
    }

    /// Declare a path as part of canonical storage without a handle.
    pub fn declare<V>(&self, path: &FieldPath<R, V>) {
        self.inner.declared.borrow_mut().insert(path.id());
    }

    // --- Interface ---

    /// Current canonical value at `path`.
    pub fn read<V: Clone>(&self, path: &FieldPath<R, V>) -> V {
        #[cfg(feature = "trace-access")]
        log::trace!("read `{}`", path.id());

        path.project(&self.inner.root.borrow()).clone()
    }

    /// Replace the canonical value at `path`.
    pub fn write<V>(&self, path: &FieldPath<R, V>, value: V) {
        if let Err(error) = self.try_write(path, value) {
            fatal(error)
        }
    }

    pub fn try_write<V>(&self, path: &FieldPath<R, V>, value: V) -> Result<(), TableError> {
        #[cfg(feature = "trace-access")]
        log::trace!("write `{}`", path.id());

        let mut root = self.inner.root.borrow_mut();
        let slot = path
            .project_mut(&mut root)
            .ok_or(TableError::ReadOnlyPath { path: path.id() })?;
        *slot = value;
        Ok(())
    }

    /// Push the current value at `path` onto its stack and store `value`.
    ///
    /// The returned index is the stack depth minus one: 0 for the first
    /// override of a path, 1 for the second, and so on.
    pub fn override_with<V: 'static>(&self, path: &FieldPath<R, V>, value: V) -> SuperIndex {
        self.try_override_with(path, value)
            .unwrap_or_else(|error| fatal(error))
    }

    pub fn try_override_with<V: 'static>(
        &self,
        path: &FieldPath<R, V>,
        value: V,
    ) -> Result<SuperIndex, TableError> {
        let id = path.id();
        if !self.inner.declared.borrow().contains(&id) {
            return Err(TableError::ForeignPath { path: id });
        }

        let mut root = self.inner.root.borrow_mut();
        let slot = path
            .project_mut(&mut root)
            .ok_or(TableError::ReadOnlyPath { path: id })?;

        let mut stacks = self.inner.stacks.borrow_mut();
        let stack = stacks
            .entry(id)
            .or_insert_with(|| Box::new(Vec::<V>::new()) as Box<dyn ErasedStack>)
            .as_any_mut()
            .downcast_mut::<Vec<V>>()
            .ok_or(TableError::TypeMismatch {
                path: id,
                expected: type_name::<V>(),
            })?;

        stack.push(mem::replace(slot, value));
        let index = SuperIndex(stack.len() - 1);

        log::debug!("overrode `{id}`, super index {}", index.0);
        Ok(index)
    }

    /// The value that `index` superseded on `path`.
    pub fn overridden<V: Clone + 'static>(&self, path: &FieldPath<R, V>, index: SuperIndex) -> V {
        self.try_overridden(path, index)
            .unwrap_or_else(|error| fatal(error))
    }

    pub fn try_overridden<V: Clone + 'static>(
        &self,
        path: &FieldPath<R, V>,
        index: SuperIndex,
    ) -> Result<V, TableError> {
        let id = path.id();
        let stacks = self.inner.stacks.borrow();
        let stack = stacks
            .get(&id)
            .ok_or(TableError::MissingStack { path: id })?
            .as_any()
            .downcast_ref::<Vec<V>>()
            .ok_or(TableError::TypeMismatch {
                path: id,
                expected: type_name::<V>(),
            })?;

        stack
            .get(index.0)
            .cloned()
            .ok_or(TableError::IndexOutOfRange {
                path: id,
                index: index.0,
                depth: stack.len(),
            })
    }

    // --- Introspection ---

    /// Run `f` against the canonical value.
    pub fn with_root<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.inner.root.borrow())
    }

    pub fn snapshot(&self) -> R
    where
        R: Clone,
    {
        self.inner.root.borrow().clone()
    }

    /// Number of superseded values recorded for `path`.
    pub fn stack_depth(&self, path: PathId) -> usize {
        self.inner
            .stacks
            .borrow()
            .get(&path)
            .map_or(0, |stack| stack.depth())
    }

    pub fn is_declared(&self, path: PathId) -> bool {
        self.inner.declared.borrow().contains(&path)
    }

    pub fn is_solidified(&self) -> bool {
        self.inner.cemented.get()
    }

    /// Handles bound to this table so far.
    pub fn linked_handles(&self) -> usize {
        self.inner.linked.get()
    }
}

impl<R: fmt::Debug> fmt::Debug for ProtectedTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedTable")
            .field("root", &self.inner.root.borrow())
            .field("stacks", &self.inner.stacks.borrow().len())
            .field("cemented", &self.inner.cemented.get())
            .field("linked", &self.inner.linked.get())
            .finish()
    }
}
