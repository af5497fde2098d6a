//! Linking: binding every handle an owner declares to the owner's table.
//!
//! An owner lists its handles in a [`Manifest`], one layer at a time. A
//! layer may name a base layer it is composed from; the linker finishes the
//! current layer, then descends into the base, so handles declared at every
//! layer end up on the one table.

use std::cell::OnceCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::{SmallVec, smallvec};

use crate::error::TableError;
use crate::path::PathId;
use crate::table::{ProtectedTable, TableCell};

/// Settable-once back-reference from a handle to its table.
///
/// NOTE: Stored as `Weak` so the holder stays the only owner of the table.
pub struct Binding<R> {
    table: OnceCell<Weak<TableCell<R>>>,
}

impl<R: 'static> Binding<R> {
    pub fn new() -> Self {
        Self {
            table: OnceCell::new(),
        }
    }

    /// Fails when this binding already points at a table other than `table`.
    pub(crate) fn check(&self, table: &Rc<TableCell<R>>, path: PathId) -> Result<(), TableError> {
        match self.table.get() {
            Some(existing) if existing.as_ptr() != Rc::as_ptr(table) => {
                Err(TableError::AlreadyLinked { path })
            }
            _ => Ok(()),
        }
    }

    /// Returns `true` when newly bound, `false` when already bound to `table`.
    pub(crate) fn bind(&self, table: &Rc<TableCell<R>>, path: PathId) -> Result<bool, TableError> {
        self.check(table, path)?;
        if self.table.get().is_some() {
            return Ok(false);
        }
        self.table
            .set(Rc::downgrade(table))
            .map_err(|_| TableError::AlreadyLinked { path })?;
        Ok(true)
    }

    /// Resolve the bound table for an access through `path`.
    pub(crate) fn table(&self, path: PathId) -> Result<ProtectedTable<R>, TableError> {
        let weak = self.table.get().ok_or(TableError::Unlinked { path })?;
        weak.upgrade()
            .map(ProtectedTable::from_inner)
            .ok_or(TableError::TableDropped { path })
    }

    pub fn is_linked(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn is_linked_to(&self, table: &ProtectedTable<R>) -> bool {
        self.table
            .get()
            .is_some_and(|weak| weak.as_ptr() == Rc::as_ptr(table.inner()))
    }
}

impl<R: 'static> Default for Binding<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Binding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("linked", &self.table.get().is_some())
            .finish()
    }
}

/// Capability the linker looks for: a handle with a table slot.
pub trait Link<R> {
    fn binding(&self) -> &Binding<R>;

    /// Path used to label this handle in logs and errors.
    fn primary_path(&self) -> PathId;

    /// Every path this handle reads, writes, or overrides.
    fn paths(&self) -> SmallVec<[PathId; 2]> {
        smallvec![self.primary_path()]
    }
}

/// Ordered list of the handles one layer declares.
pub struct Manifest<'a, R> {
    entries: SmallVec<[&'a dyn Link<R>; 8]>,
}

impl<'a, R> Manifest<'a, R> {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    pub fn push(&mut self, handle: &'a dyn Link<R>) -> &mut Self {
        self.entries.push(handle);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Link<R>> + '_ {
        self.entries.iter().copied()
    }
}

impl<R> Default for Manifest<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Implemented by the type that owns a table and its handles.
///
/// ```
/// use protected_table::{field_path, Manifest, Members, Protected, ProtectedTable};
///
/// struct Point { x: i32 }
///
/// struct Shape { x: Protected<Point, i32> }
///
/// impl Members<Point> for Shape {
///     fn members<'a>(&'a self, manifest: &mut Manifest<'a, Point>) {
///         manifest.push(&self.x);
///     }
/// }
///
/// let shape = Shape { x: Protected::new(field_path!(Point, x)) };
/// let table = ProtectedTable::with_owner(Point { x: 1 }, &shape);
/// assert_eq!(shape.x.get(), 1);
/// # drop(table);
/// ```
pub trait Members<R> {
    /// Push this layer's handles, in declaration order.
    fn members<'a>(&'a self, manifest: &mut Manifest<'a, R>);

    /// The layer this one is composed from, if any.
    fn base(&self) -> Option<&dyn Members<R>> {
        None
    }
}

/// Handles gathered from every layer, paired with their bindings.
type Pending<'a, R> = SmallVec<[(&'a dyn Link<R>, &'a Binding<R>); 8]>;

/// Link `owner` and every base layer below it.
///
/// All or nothing: every handle is checked before the first one is bound,
/// so a handle held by another table leaves the whole owner unlinked.
pub(crate) fn link_layers<R: 'static>(
    table: &ProtectedTable<R>,
    owner: &dyn Members<R>,
) -> Result<usize, TableError> {
    let mut pending = Pending::new();
    collect_layers(owner, 0, &mut pending);

    for (handle, binding) in &pending {
        binding.check(table.inner(), handle.primary_path())?;
    }

    let mut bound = 0;
    for (handle, binding) in pending {
        if table.attach(handle, binding)? {
            bound += 1;
        }
    }
    Ok(bound)
}

/// Gather `layer`'s handles, then those of each base below it.
fn collect_layers<'a, R>(
    layer: &'a dyn Members<R>,
    depth: usize,
    pending: &mut Pending<'a, R>,
) {
    let mut manifest = Manifest::new();
    layer.members(&mut manifest);
    log::debug!("collecting layer {depth}: {} handle(s)", manifest.len());

    pending.extend(manifest.iter().map(|handle| (handle, handle.binding())));

    if let Some(base) = layer.base() {
        collect_layers(base, depth + 1, pending);
    }
}
