//! Property-based tests for invariants that should hold across the space of
//! models, not just the handful of scenarios fixed in `scenarios.rs`.

use proptest::prelude::*;

use kanren_clp::prelude::*;

fn all_different_model(n: usize, max_value: u32) -> Model {
    let mut model = Model::new(max_value);
    let xs = model.new_variables(n, Domain::full(max_value));
    model.add_constraint(ConstraintKind::AllDifferent { vars: xs }).unwrap();
    model
}

proptest! {
    /// Two orderings of the same conjunction of constraints reach the same
    /// fixpoint: propagation has no hidden dependence on insertion order.
    #[test]
    fn constraint_order_independence(a in 1u32..20, b in 1u32..20, k in -5i64..5) {
        let bound_hi = a.max(b) + b;

        let mut forward = Model::new(30);
        let x = forward.new_variable(Domain::full(30));
        let y = forward.new_variable(Domain::full(30));
        let lo = forward.new_variable(Domain::singleton(a.min(30), 30));
        let hi = forward.new_variable(Domain::singleton(bound_hi.min(30), 30));
        forward.add_constraint(ConstraintKind::Arithmetic { dst: y, src: x, k }).unwrap();
        forward.add_constraint(ConstraintKind::Inequality { x, y: lo, op: CmpOp::Ge }).unwrap();
        forward.add_constraint(ConstraintKind::Inequality { x: y, y: hi, op: CmpOp::Le }).unwrap();

        let mut reordered = Model::new(30);
        let x2 = reordered.new_variable(Domain::full(30));
        let y2 = reordered.new_variable(Domain::full(30));
        let lo2 = reordered.new_variable(Domain::singleton(a.min(30), 30));
        let hi2 = reordered.new_variable(Domain::singleton(bound_hi.min(30), 30));
        reordered.add_constraint(ConstraintKind::Inequality { x: y2, y: hi2, op: CmpOp::Le }).unwrap();
        reordered.add_constraint(ConstraintKind::Inequality { x: x2, y: lo2, op: CmpOp::Ge }).unwrap();
        reordered.add_constraint(ConstraintKind::Arithmetic { dst: y2, src: x2, k }).unwrap();

        let store_a = kanren_clp::propagate::propagate_to_fixpoint(&forward.initial_store(), &forward);
        let store_b = kanren_clp::propagate::propagate_to_fixpoint(&reordered.initial_store(), &reordered);

        match (store_a, store_b) {
            (Ok(sa), Ok(sb)) => {
                prop_assert_eq!(
                    forward.domain(&sa, x).iterate().collect::<Vec<_>>(),
                    reordered.domain(&sb, x2).iterate().collect::<Vec<_>>()
                );
                prop_assert_eq!(
                    forward.domain(&sa, y).iterate().collect::<Vec<_>>(),
                    reordered.domain(&sb, y2).iterate().collect::<Vec<_>>()
                );
            }
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "order changed satisfiability"),
        }
    }

    /// Running the fixpoint propagator a second time over its own output
    /// changes nothing: the result is already a fixpoint.
    #[test]
    fn propagation_is_idempotent(n in 2usize..6, max_value in 4u32..10) {
        prop_assume!((n as u32) <= max_value);
        let model = all_different_model(n, max_value);
        let once = kanren_clp::propagate::propagate_to_fixpoint(&model.initial_store(), &model);
        if let Ok(once) = once {
            let twice = kanren_clp::propagate::propagate_to_fixpoint(&once, &model).unwrap();
            for &v in model.variables() {
                prop_assert_eq!(
                    model.domain(&once, v).iterate().collect::<Vec<_>>(),
                    model.domain(&twice, v).iterate().collect::<Vec<_>>()
                );
            }
        }
    }

    /// All-different is infeasible exactly when there are more variables
    /// than available values.
    #[test]
    fn all_different_infeasible_iff_pigeonholed(n in 1usize..6, max_value in 1u32..6) {
        let model = all_different_model(n, max_value);
        let solutions = solve(&model, &SearchConfig::default()).unwrap();
        if n as u32 > max_value {
            prop_assert!(solutions.is_empty());
        } else {
            prop_assert!(!solutions.is_empty());
        }
    }

    /// Every returned solution actually satisfies all-different: no two
    /// variables share a value.
    #[test]
    fn all_different_solutions_are_pairwise_distinct(n in 1usize..5, max_value in 1u32..6) {
        prop_assume!((n as u32) <= max_value);
        let model = all_different_model(n, max_value);
        let solutions = solve(&model, &SearchConfig::default()).unwrap();
        for sol in &solutions {
            let values: Vec<u32> = model
                .variables()
                .iter()
                .map(|&v| model.domain(sol, v).singleton_value().expect("solution must be ground"))
                .collect();
            for i in 0..values.len() {
                for j in (i + 1)..values.len() {
                    prop_assert_ne!(values[i], values[j]);
                }
            }
        }
    }

    /// Two stores branched from the same ancestor never observe each
    /// other's bindings or domain narrowing.
    #[test]
    fn sibling_branches_are_isolated(v1 in 1u32..10, v2 in 1u32..10) {
        prop_assume!(v1 != v2);
        let mut model = Model::new(10);
        let x = model.new_variable(Domain::full(10));
        let root = model.initial_store();
        let branch1 = root.set_domain(x, Domain::singleton(v1, 10)).unwrap();
        let branch2 = root.set_domain(x, Domain::singleton(v2, 10)).unwrap();
        prop_assert_eq!(model.domain(&branch1, x).singleton_value(), Some(v1));
        prop_assert_eq!(model.domain(&branch2, x).singleton_value(), Some(v2));
        prop_assert!(!model.domain(&root, x).is_singleton());
    }

    /// Sequential and parallel search agree on the solution count for the
    /// same model (as sets of assignments, sequential search is the oracle).
    #[test]
    fn parallel_matches_sequential_solution_count(n in 2usize..5) {
        let max_value = n as u32;
        let sequential = all_different_model(n, max_value);
        let parallel = all_different_model(n, max_value);

        let seq = solve(&sequential, &SearchConfig::default()).unwrap();
        let par = kanren_clp::parallel::solve_parallel(
            &parallel,
            &SearchConfig::default(),
            &ParallelConfig { worker_count: 3 },
        )
        .unwrap();
        prop_assert_eq!(seq.len(), par.len());
    }
}
