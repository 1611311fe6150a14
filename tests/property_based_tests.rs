mod common;

use common::strategies::*;
use mediator_core::binding::{Binding, BindingIndex, Constraint, IndexKey, Variance};
use mediator_core::callback::{Reply, ResultSet};
use mediator_core::handler::{CompositeHandler, HandlerRef};
use mediator_core::policy::{handles, looksup};
use mediator_core::types::Literal;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn binding(constraint: Constraint) -> Arc<Binding> {
    Arc::new(
        Binding::builder(constraint)
            .function(|_, _| Ok(Reply::Nothing))
            .build()
            .unwrap(),
    )
}

fn specs_in_order(index: &BindingIndex, specs: &[(u64, ConstraintSpec)]) -> Vec<ConstraintSpec> {
    index
        .snapshot()
        .iter()
        .map(|binding| {
            specs
                .iter()
                .find(|(id, _)| *id == binding.id().value())
                .map(|(_, spec)| spec.clone())
                .unwrap()
        })
        .collect()
}

proptest! {
    /// Property: inserting the same declarations in the same order always
    /// yields the same ranked order
    #[test]
    fn ranking_is_deterministic(specs in binding_set_strategy()) {
        let build = || {
            let mut index = BindingIndex::new(handles());
            let mut declared = Vec::new();
            for spec in &specs {
                let binding = binding(spec.to_constraint());
                declared.push((binding.id().value(), spec.clone()));
                index.insert(binding);
            }
            specs_in_order(&index, &declared)
        };
        let first = build();
        let second = build();
        prop_assert_eq!(&first, &second);

        // rank classes never interleave
        let ranks: Vec<u8> = first.iter().map(ConstraintSpec::rank).collect();
        prop_assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]), "ranks out of order: {:?}", ranks);
    }

    /// Property: bindings sharing a key stay contiguous and keep insertion
    /// order, whatever the insertion sequence
    #[test]
    fn same_key_runs_are_contiguous(keys in literal_keys_strategy()) {
        let mut index = BindingIndex::new(looksup());
        let mut ids = Vec::new();
        for key in &keys {
            let binding = binding(Constraint::from(*key));
            ids.push((*key, binding.id()));
            index.insert(binding);
        }
        for key in keys.iter().copied() {
            let expected: Vec<_> = ids.iter().filter(|(k, _)| *k == key).map(|(_, id)| *id).collect();
            let run = index.snapshot_from(&IndexKey::Literal(Literal::Int(key))).unwrap();
            let found: Vec<_> = run.iter().take(expected.len()).map(|b| b.id()).collect();
            prop_assert_eq!(found, expected);
        }
    }

    /// Property: under invariant matching, once a binding fails to match no
    /// later binding in the traversal can match
    #[test]
    fn invariant_short_circuit_has_no_false_negatives(keys in literal_keys_strategy(), probe in 0i64..6) {
        let mut index = BindingIndex::new(looksup());
        for key in &keys {
            index.insert(binding(Constraint::from(*key)));
        }
        let candidate = Constraint::from(probe);
        let total = keys.iter().filter(|key| **key == probe).count();

        let Some(traversal) = index.snapshot_from(&IndexKey::Literal(Literal::Int(probe))) else {
            prop_assert_eq!(total, 0);
            return Ok(());
        };
        let first_miss = traversal
            .iter()
            .position(|binding| !binding.matches(&candidate, Variance::Invariant))
            .unwrap_or(traversal.len());
        prop_assert_eq!(first_miss, total);
        prop_assert!(traversal[first_miss..]
            .iter()
            .all(|binding| !binding.matches(&candidate, Variance::Invariant)));
    }

    /// Property: settled results follow the order they were received in, not
    /// the order they completed in
    #[test]
    fn pending_results_keep_receipt_order(delays in result_delays_strategy()) {
        let composer: HandlerRef = Arc::new(CompositeHandler::new());
        let results = ResultSet::new();
        for (position, delay) in delays.iter().enumerate() {
            let reply = match delay {
                None => Reply::value(position),
                Some(millis) => {
                    let millis = *millis;
                    Reply::pending(async move {
                        tokio::time::sleep(Duration::from_millis(millis)).await;
                        Ok(Reply::value(position))
                    })
                }
            };
            results.receive(reply, false, false, &composer).unwrap();
        }

        let settled = tokio_test::block_on(results.get(true).settle()).unwrap();
        let order: Vec<usize> = settled
            .into_values()
            .iter()
            .filter_map(|value| value.downcast_ref::<usize>().copied())
            .collect();
        prop_assert_eq!(order, (0..delays.len()).collect::<Vec<_>>());
    }
}
