//! Protected fields with overridable values.
//!
//! A [`ProtectedTable`] holds an aggregate's canonical value. Handles
//! ([`Protected`], [`Computed`]) are the only way in: they read and write
//! through the table and can override their field once, keeping the
//! replaced value reachable as the super value.
//!
//! ```
//! use protected_table::{field_path, Manifest, Members, Protected, ProtectedTable, SuperIndex};
//!
//! struct Point { x: i32, y: i32 }
//!
//! struct Shape {
//!     x: Protected<Point, i32>,
//!     y: Protected<Point, i32>,
//! }
//!
//! impl Members<Point> for Shape {
//!     fn members<'a>(&'a self, manifest: &mut Manifest<'a, Point>) {
//!         manifest.push(&self.x).push(&self.y);
//!     }
//! }
//!
//! let shape = Shape {
//!     x: Protected::new(field_path!(Point, x)),
//!     y: Protected::new(field_path!(Point, y)),
//! };
//! let _table = ProtectedTable::with_owner(Point { x: 1, y: 2 }, &shape);
//!
//! assert_eq!(shape.x.override_with(10), SuperIndex(0));
//! assert_eq!(shape.x.get(), 10);
//! assert_eq!(shape.x.super_value(), 1);
//! ```
//!
//! Everything here is single-threaded: `Rc` and `RefCell` keep the types
//! `!Send` and `!Sync`.

// --- path ---
mod path;
pub use path::{FieldPath, Getter, PathId, Setter};

// --- errors ---
mod error;
pub use error::TableError;

// --- table ---
mod table;
pub use table::{ProtectedTable, SuperIndex};

// --- linker ---
mod link;
pub use link::{Binding, Link, Manifest, Members};

// --- handles ---
mod handle;
pub use handle::{Computed, OverrideState, Protected};
