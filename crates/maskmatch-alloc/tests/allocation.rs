use maskmatch_alloc::{
    Allocation, AllocationError, CostTable, Optimizer, OptimizerConfig, SolveStatus, optimize,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const TOL: f64 = 1e-6;

fn grid(rows: &[&[f64]]) -> CostTable {
    CostTable::from_fn(rows.len(), rows[0].len(), |i, j| rows[i][j])
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!((actual - expected).abs() < TOL, "{what} = {actual} (expected {expected})");
}

/// Cost of filling recipients in index order, an upper bound on the optimum.
fn greedy_cost(donors: &[f64], recipients: &[f64], cost: impl Fn(usize, usize) -> f64) -> f64 {
    let mut remaining = recipients.to_vec();
    let mut total = 0.0;
    for (i, &supply) in donors.iter().enumerate() {
        let mut left = supply;
        for (j, room) in remaining.iter_mut().enumerate() {
            let amount = left.min(*room);
            total += amount * cost(i, j);
            *room -= amount;
            left -= amount;
        }
        assert!(left <= TOL, "greedy could not place donor {i}");
    }
    total
}

#[test]
fn test_five_donors_two_recipients_zero_cost() {
    let donors = [5.0, 1.0, 1.0, 1.0, 2.0];
    let recipients = [5.0, 5.0];
    let costs = CostTable::uniform(5, 2, 0.0);

    let plan = optimize(&donors, &recipients, &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_close(plan.total_donated(), 10.0, "total donated");
    for j in 0..2 {
        assert!(plan.received_by(j) <= 5.0 + TOL, "recipient {j} over capacity");
    }
    assert!(plan.check(&donors, &recipients, TOL).is_empty());
    assert_close(plan.total_cost.unwrap(), 0.0, "total cost");
}

#[test]
fn test_single_donor_over_capacity_is_infeasible() {
    let plan = optimize(&[2.0], &[1.0], &CostTable::uniform(1, 1, 1.0)).unwrap();

    assert_eq!(plan.status, SolveStatus::Infeasible);
    assert!(plan.allocations.is_empty());
    assert_eq!(plan.total_cost, None);
}

#[test]
fn test_single_pair_ships_everything() {
    let mut costs = CostTable::new();
    costs.insert(0, 0, 7.0);

    let plan = optimize(&[3.0], &[3.0], &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_eq!(plan.allocations.len(), 1);
    let Allocation { donor_id, recipient_id, donation_amount } = plan.allocations[0];
    assert_eq!((donor_id, recipient_id), (0, 0));
    assert_close(donation_amount, 3.0, "donation");
    assert_close(plan.total_cost.unwrap(), 21.0, "total cost");
}

#[test]
fn test_cheapest_routes_win() {
    let donors = [2.0, 3.0];
    let recipients = [5.0, 5.0];
    let costs = grid(&[&[1.0, 10.0], &[10.0, 1.0]]);

    let plan = optimize(&donors, &recipients, &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_close(plan.total_cost.unwrap(), 5.0, "total cost");
    assert_eq!(plan.allocations.len(), 2);
    assert!(plan.allocations.iter().all(|a| a.donor_id == a.recipient_id));
}

#[test]
fn test_capacity_forces_smallest_penalty_donor_to_move() {
    // Both donors prefer recipient 0, which only fits 5 of the 8 units.
    // Donor 0 pays 1 extra per unit to move, donor 1 pays 4, so donor 0 moves 3.
    let donors = [4.0, 4.0];
    let recipients = [5.0, 3.0];
    let costs = grid(&[&[1.0, 2.0], &[1.0, 5.0]]);

    let plan = optimize(&donors, &recipients, &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_close(plan.total_cost.unwrap(), 11.0, "total cost");
    assert_close(plan.received_by(0), 5.0, "recipient 0");
    assert_close(plan.received_by(1), 3.0, "recipient 1");
    let moved: f64 = plan
        .allocations
        .iter()
        .filter(|a| a.donor_id == 0 && a.recipient_id == 1)
        .map(|a| a.donation_amount)
        .sum();
    assert_close(moved, 3.0, "donor 0 -> recipient 1");
}

#[test]
fn test_partial_fill_uses_single_nearest_recipient() {
    let plan = optimize(&[1.0], &[4.0, 4.0, 4.0], &grid(&[&[3.0, 1.0, 2.0]])).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_eq!(plan.allocations.len(), 1);
    assert_eq!(plan.allocations[0].recipient_id, 1);
    assert_close(plan.total_cost.unwrap(), 1.0, "total cost");
}

#[test]
fn test_zero_capacities_produce_no_records() {
    let plan = optimize(&[0.0, 2.0], &[0.0, 2.0], &grid(&[&[0.0, 9.0], &[0.0, 4.0]])).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_eq!(plan.donated_by(0), 0.0);
    assert_eq!(plan.received_by(0), 0.0);
    assert_close(plan.total_cost.unwrap(), 8.0, "total cost");
    assert!(plan.allocations.iter().all(|a| a.donation_amount > 0.0));
}

#[test]
fn test_all_zero_supply_is_optimal_and_empty() {
    let plan = optimize(&[0.0, 0.0], &[1.0], &CostTable::uniform(2, 1, 3.0)).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert!(plan.is_empty());
    assert_eq!(plan.total_cost, Some(0.0));
}

#[test]
fn test_supply_above_total_capacity_is_infeasible() {
    let plan = optimize(&[3.0, 3.0], &[2.0, 2.0], &CostTable::uniform(2, 2, 1.0)).unwrap();

    assert!(!plan.status.has_solution());
    assert!(plan.is_empty());
}

#[test]
fn test_larger_grid_holds_invariants_and_beats_greedy() {
    let donors = [3.0, 1.5, 4.0, 2.0, 0.5, 6.0];
    let recipients = [5.0, 4.0, 6.0, 3.0];
    let cost = |i: usize, j: usize| ((i * 7 + j * 13) % 11 + 1) as f64;
    let costs = CostTable::from_fn(donors.len(), recipients.len(), cost);

    let plan = optimize(&donors, &recipients, &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert!(plan.check(&donors, &recipients, TOL).is_empty(), "{:?}", plan.check(&donors, &recipients, TOL));
    assert!(plan.allocations.iter().all(|a| a.donation_amount > 0.0));
    assert!(plan.total_cost.unwrap() <= greedy_cost(&donors, &recipients, cost) + TOL);
}

#[test]
fn test_balanced_random_grid_solves_to_optimality() {
    let mut rng = StdRng::seed_from_u64(42);
    let (d, r) = (80, 60);

    // Each donor's supply lands on a random recipient, so capacity is exactly used up
    let donors: Vec<f64> = (0..d).map(|_| rng.gen_range(1..=10) as f64).collect();
    let mut recipients = vec![0.0; r];
    for &supply in &donors {
        recipients[rng.gen_range(0..r)] += supply;
    }
    let table: Vec<Vec<f64>> = (0..d)
        .map(|_| (0..r).map(|_| rng.gen_range(1..=100) as f64).collect())
        .collect();
    let cost = |i: usize, j: usize| table[i][j];
    let costs = CostTable::from_fn(d, r, cost);

    let plan = optimize(&donors, &recipients, &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    let violations = plan.check(&donors, &recipients, TOL);
    assert!(violations.is_empty(), "{violations:?}");

    let total = plan.total_cost.unwrap();
    let cheapest: f64 = donors
        .iter()
        .zip(&table)
        .map(|(supply, row)| supply * row.iter().copied().fold(f64::INFINITY, f64::min))
        .sum();
    assert!(total >= cheapest - TOL, "cost {total} below the per-donor floor {cheapest}");
    assert!(total <= greedy_cost(&donors, &recipients, cost) + TOL);
    // A vertex of the transportation polytope has at most d + r - 1 active flows
    assert!(plan.allocations.len() < d + r, "{} records", plan.allocations.len());
}

#[test]
fn test_records_are_donor_major() {
    let plan = optimize(&[2.0, 2.0], &[1.0, 1.0, 2.0], &CostTable::uniform(2, 3, 1.0)).unwrap();

    let keys: Vec<_> = plan.allocations.iter().map(|a| (a.donor_id, a.recipient_id)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_degenerate_inputs_are_rejected() {
    let costs = CostTable::uniform(1, 1, 1.0);

    assert!(matches!(optimize(&[], &[1.0], &costs), Err(AllocationError::InvalidModel(_))));
    assert!(matches!(optimize(&[1.0], &[], &costs), Err(AllocationError::InvalidModel(_))));
    assert!(matches!(optimize(&[-1.0], &[1.0], &costs), Err(AllocationError::InvalidModel(_))));
}

#[test]
fn test_missing_cost_is_an_error_not_zero() {
    let mut costs = CostTable::new();
    costs.insert(0, 0, 1.0);

    assert_eq!(
        optimize(&[1.0], &[1.0, 1.0], &costs).unwrap_err(),
        AllocationError::MissingCostData { donor: 0, recipient: 1 }
    );
}

#[test]
fn test_labelled_costs() {
    let costs = CostTable::from_labels([
        ("d0_r0", 125.0),
        ("d0_r1", 435.0),
        ("d1_r0", 300.0),
        ("d1_r1", 90.0),
    ])
    .unwrap();

    let plan = optimize(&[1.0, 1.0], &[1.0, 1.0], &costs).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_close(plan.total_cost.unwrap(), 215.0, "total cost");
}

#[test]
fn test_exhausted_solver_reports_abnormal() {
    let config = OptimizerConfig {
        max_iterations: Some(0),
        ..OptimizerConfig::default()
    };

    let plan = Optimizer::from_config(&config)
        .unwrap()
        .optimize(&[1.0], &[1.0], &CostTable::uniform(1, 1, 1.0))
        .unwrap();

    assert_eq!(plan.status, SolveStatus::Abnormal);
    assert!(plan.is_empty());
}

#[test]
fn test_into_parts() {
    let (allocations, status) = optimize(&[1.0], &[2.0], &CostTable::uniform(1, 1, 4.0))
        .unwrap()
        .into_parts();

    assert_eq!(status, SolveStatus::Optimal);
    assert_eq!(allocations.len(), 1);
    assert_close(allocations[0].donation_amount, 1.0, "donation");
}

#[cfg(feature = "serde")]
#[test]
fn test_plan_serializes_with_record_fields() {
    let plan = optimize(&[3.0], &[3.0], &CostTable::uniform(1, 1, 7.0)).unwrap();

    let json = serde_json::to_value(&plan).unwrap();

    assert_eq!(json["status"], "optimal");
    assert_eq!(json["allocations"][0]["donor_id"], 0);
    assert_eq!(json["allocations"][0]["recipient_id"], 0);
}
