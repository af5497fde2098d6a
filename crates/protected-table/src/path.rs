//! Field paths: stable identifiers plus typed projections into the root.
//!
//! A `FieldPath<R, V>` is a lens over the aggregate `R` that reaches one
//! field of type `V`. Two paths with equal `PathId`s address the same slot.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

/// Shared getter closure stored in a computed slot.
pub type Getter<V> = Rc<dyn Fn() -> V>;

/// Shared setter closure stored in a computed slot.
pub type Setter<V> = Rc<dyn Fn(V)>;

/// Stable, hashable identity of one field slot on a root type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId {
    root: TypeId,
    name: &'static str,
}

impl PathId {
    pub fn of<R: 'static>(name: &'static str) -> Self {
        Self {
            root: TypeId::of::<R>(),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn root(&self) -> TypeId {
        self.root
    }
}

impl fmt::Debug for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathId({})", self.name)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Typed accessor for one field of `R`.
///
/// Read-only paths carry no mutable projection; the table rejects
/// `write` and `override_with` through them.
pub struct FieldPath<R, V> {
    id: PathId,
    get: fn(&R) -> &V,
    get_mut: Option<fn(&mut R) -> &mut V>,
}

impl<R: 'static, V> FieldPath<R, V> {
    pub fn new(name: &'static str, get: fn(&R) -> &V, get_mut: fn(&mut R) -> &mut V) -> Self {
        Self {
            id: PathId::of::<R>(name),
            get,
            get_mut: Some(get_mut),
        }
    }

    pub fn read_only(name: &'static str, get: fn(&R) -> &V) -> Self {
        Self {
            id: PathId::of::<R>(name),
            get,
            get_mut: None,
        }
    }
}

impl<R, V> FieldPath<R, V> {
    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn is_writable(&self) -> bool {
        self.get_mut.is_some()
    }

    pub(crate) fn project<'r>(&self, root: &'r R) -> &'r V {
        (self.get)(root)
    }

    pub(crate) fn project_mut<'r>(&self, root: &'r mut R) -> Option<&'r mut V> {
        self.get_mut.map(|get_mut| get_mut(root))
    }
}

// Manual impls: derives would demand `R: Clone` and `V: Clone`.
impl<R, V> Clone for FieldPath<R, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, V> Copy for FieldPath<R, V> {}

impl<R, V> PartialEq for FieldPath<R, V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R, V> Eq for FieldPath<R, V> {}

impl<R, V> fmt::Debug for FieldPath<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPath")
            .field("id", &self.id)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Build a [`FieldPath`] for `Root.field`.
///
/// ```
/// use protected_table::field_path;
///
/// struct Point { x: i32 }
///
/// let x = field_path!(Point, x);
/// assert_eq!(x.id().name(), "Point.x");
///
/// let ro = field_path!(Point, x, read_only);
/// assert!(!ro.is_writable());
/// ```
#[macro_export]
macro_rules! field_path {
    ($root:ty, $field:ident) => {
        $crate::FieldPath::<$root, _>::new(
            concat!(stringify!($root), ".", stringify!($field)),
            |root| &root.$field,
            |root| &mut root.$field,
        )
    };
    ($root:ty, $field:ident, read_only) => {
        $crate::FieldPath::<$root, _>::read_only(
            concat!(stringify!($root), ".", stringify!($field)),
            |root| &root.$field,
        )
    };
}
