//! Property checks for the override table.

use proptest::prelude::*;
use protected_table::{Manifest, Members, Protected, ProtectedTable, SuperIndex, field_path};

#[derive(Clone, Debug, PartialEq)]
struct Cells {
    a: i64,
    b: String,
}

fn table(a: i64, b: &str) -> ProtectedTable<Cells> {
    let table = ProtectedTable::new(Cells {
        a,
        b: b.to_string(),
    });
    table.declare(&field_path!(Cells, a));
    table.declare(&field_path!(Cells, b));
    table
}

struct Owner {
    a: Protected<Cells, i64>,
}

impl Members<Cells> for Owner {
    fn members<'a>(&'a self, manifest: &mut Manifest<'a, Cells>) {
        manifest.push(&self.a);
    }
}

proptest! {
    #[test]
    fn prop_write_then_read(initial in any::<i64>(), writes in prop::collection::vec(any::<i64>(), 1..16)) {
        let table = table(initial, "");
        let a = field_path!(Cells, a);

        for value in &writes {
            table.write(&a, *value);
            prop_assert_eq!(table.read(&a), *value);
        }
    }

    #[test]
    fn prop_override_chain_preserves_history(
        initial in ".{0,8}",
        overrides in prop::collection::vec(".{0,8}", 1..24),
    ) {
        let table = table(0, &initial);
        let b = field_path!(Cells, b);

        let mut expected_history = vec![initial.clone()];
        for (n, value) in overrides.iter().enumerate() {
            let index = table.override_with(&b, value.clone());
            prop_assert_eq!(index, SuperIndex(n));
            prop_assert_eq!(&table.read(&b), value);
            expected_history.push(value.clone());
        }

        // Every index resolves to the value it superseded, regardless of
        // how many overrides followed
        for (n, superseded) in expected_history.iter().take(overrides.len()).enumerate() {
            prop_assert_eq!(&table.overridden(&b, SuperIndex(n)), superseded);
        }
        prop_assert_eq!(table.stack_depth(b.id()), overrides.len());
        prop_assert!(table.try_overridden(&b, SuperIndex(overrides.len())).is_err());
    }

    #[test]
    fn prop_handle_override_is_one_shot(initial in any::<i64>(), first in any::<i64>(), rest in prop::collection::vec(any::<i64>(), 0..8)) {
        let owner = Owner { a: Protected::new(field_path!(Cells, a)) };
        let table = ProtectedTable::with_owner(Cells { a: initial, b: String::new() }, &owner);

        let captured = owner.a.override_with(first);
        for value in rest {
            prop_assert_eq!(owner.a.override_with(value), captured);
            prop_assert_eq!(owner.a.super_value(), initial);
        }

        prop_assert_eq!(captured, SuperIndex(0));
        prop_assert_eq!(owner.a.get(), first);
        prop_assert_eq!(table.stack_depth(owner.a.path().id()), 1);
    }
}
