use mediator_core::binding::Constraint;
use proptest::prelude::*;

/// Constraint shapes that can be generated without compile-time types
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSpec {
    Number(i64),
    Text(String),
    Predicate,
    Unconstrained,
}

impl ConstraintSpec {
    pub fn to_constraint(&self) -> Constraint {
        match self {
            ConstraintSpec::Number(number) => Constraint::from(*number),
            ConstraintSpec::Text(text) => Constraint::from(text.as_str()),
            ConstraintSpec::Predicate => Constraint::predicate(|_| true),
            ConstraintSpec::Unconstrained => Constraint::Unconstrained,
        }
    }

    /// Rank class as ordered by every policy comparator
    pub fn rank(&self) -> u8 {
        match self {
            ConstraintSpec::Number(_) | ConstraintSpec::Text(_) => 0,
            ConstraintSpec::Predicate => 2,
            ConstraintSpec::Unconstrained => 3,
        }
    }
}

pub fn constraint_spec_strategy() -> impl Strategy<Value = ConstraintSpec> {
    prop_oneof![
        4 => (0i64..8).prop_map(ConstraintSpec::Number),
        3 => "[a-d]{1,2}".prop_map(ConstraintSpec::Text),
        1 => Just(ConstraintSpec::Predicate),
        1 => Just(ConstraintSpec::Unconstrained),
    ]
}

pub fn binding_set_strategy() -> impl Strategy<Value = Vec<ConstraintSpec>> {
    prop::collection::vec(constraint_spec_strategy(), 1..24)
}

/// Literal keys only, with plenty of duplicates
pub fn literal_keys_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..6, 1..32)
}

/// Per-result completion delays in milliseconds; `None` means synchronous
pub fn result_delays_strategy() -> impl Strategy<Value = Vec<Option<u64>>> {
    prop::collection::vec(prop::option::of(0u64..5), 1..8)
}
