//! Property-based tests for the repository.
//!
//! These tests use proptest to generate random names and values and verify
//! that the addressing and cloning invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::error::ErrorKind;
    use crate::repository::Repository;
    use crate::scope::{OwnerId, Scope};
    use crate::value::Value;
    use proptest::prelude::*;

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            ".*".prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            (-1.0e9..1.0e9f64).prop_map(Value::from),
        ]
    }

    fn name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_.-]{1,16}"
    }

    // ============================================================================
    // Addressing
    // ============================================================================

    proptest! {
        /// Property: whatever is set can be read back unchanged
        #[test]
        fn set_then_get_round_trips(category in name(), item in name(), value in scalar()) {
            let repo = Repository::new();
            repo.set(Scope::Local, Some(&category), &item, value.clone()).unwrap();
            prop_assert_eq!(repo.get(Scope::Local, Some(&category), &item).unwrap(), value);
        }

        /// Property: the second of two writes wins and no duplicate is kept
        #[test]
        fn second_write_wins(item in name(), first in scalar(), second in scalar()) {
            let repo = Repository::new();
            repo.set(Scope::Global, None, &item, first).unwrap();
            repo.set(Scope::Global, None, &item, second.clone()).unwrap();
            prop_assert_eq!(repo.get(Scope::Global, None, &item).unwrap(), second);
            prop_assert_eq!(repo.item_count(Scope::Global), 1);
        }

        /// Property: an owner's data is never visible from another owner
        #[test]
        fn owners_are_isolated(category in name(), item in name(), value in scalar()) {
            let repo = Repository::new();
            let writer = OwnerId::allocate();
            let reader = OwnerId::allocate();
            repo.set(Scope::Owner(writer), Some(&category), &item, value).unwrap();

            let err = repo.get(Scope::Owner(reader), Some(&category), &item).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::ScopeNotFound);
        }

        /// Property: integers stored as strings read back as integers
        #[test]
        fn numeric_strings_coerce(n in any::<i64>()) {
            let repo = Repository::new();
            repo.set(Scope::Local, None, "n", n.to_string()).unwrap();
            prop_assert_eq!(repo.get_typed::<i64>(Scope::Local, None, "n").unwrap(), n);
        }
    }

    // ============================================================================
    // Cloning
    // ============================================================================

    proptest! {
        /// Property: after a clone the two scopes evolve independently
        #[test]
        fn clone_then_diverge(item in name(), before in scalar(), after in scalar()) {
            let repo = Repository::new();
            let worker = OwnerId::allocate();
            repo.set(Scope::Global, None, &item, before.clone()).unwrap();
            repo.clone_scope(Scope::Global, Scope::Owner(worker), true).unwrap();
            repo.set(Scope::Global, None, &item, after.clone()).unwrap();

            prop_assert_eq!(repo.get(Scope::Owner(worker), None, &item).unwrap(), before);
            prop_assert_eq!(repo.get(Scope::Global, None, &item).unwrap(), after);
        }

        /// Property: a non-overwriting clone never changes an existing item
        #[test]
        fn clone_without_overwrite_preserves_destination(
            item in name(),
            source in scalar(),
            existing in scalar(),
        ) {
            let repo = Repository::new();
            let worker = OwnerId::allocate();
            repo.set(Scope::Global, None, &item, source).unwrap();
            repo.set(Scope::Owner(worker), None, &item, existing.clone()).unwrap();

            let err = repo
                .clone_item(Scope::Global, Scope::Owner(worker), None, &item, false)
                .unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Collision);
            prop_assert_eq!(repo.get(Scope::Owner(worker), None, &item).unwrap(), existing);
        }
    }
}
