//! Result extraction
//!
//! Turns a [`SolvedModel`] back into per-region allocations. Loads, capacities
//! and latency limits are recomputed here from the raw variable values and
//! checked against the solver's own evaluation of the same expressions; the
//! total cost is likewise recomputed and checked against the objective.

use std::collections::BTreeMap;

use capplan_core::{CapacityError, InstanceSize, RegionId, Result, Scenario, SizeTable};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::CapacityModel;
use crate::solve::{backend_available, solve, Outcome, SolvedModel};

/// Distance from an integer above which an instance count is flagged
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Relative tolerance between recomputed cost and solver objective
pub const COST_TOLERANCE: f64 = 1e-6;

fn agrees(recomputed: f64, solver: f64) -> bool {
    let scale = recomputed.abs().max(solver.abs()).max(1.0);
    (recomputed - solver).abs() <= COST_TOLERANCE * scale
}

/// Solved allocation of one region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionAllocation {
    pub region: RegionId,
    pub critical: bool,

    /// Instance counts rounded to the nearest integer
    pub instances: SizeTable<u64>,

    /// Instance counts exactly as returned by the solver
    pub raw_instances: SizeTable<f64>,

    /// Set when any raw count is not integral within tolerance
    pub non_integral: bool,

    /// Outbound routed fraction per destination
    pub routes: BTreeMap<RegionId, f64>,

    /// Load routed into this region
    pub incoming_load: f64,

    /// Total compute units
    pub capacity: f64,

    /// capacity * max_latency (* criticality factor)
    pub latency_limit: f64,

    /// incoming_load * base_latency, bounded by `latency_limit`
    pub weighted_latency: f64,

    /// Incoming load as evaluated by the solver
    pub solver_incoming_load: f64,

    /// Latency limit as evaluated by the solver
    pub solver_latency_limit: f64,

    /// Monthly cost of this region's instances
    pub monthly_cost: f64,
}

impl RegionAllocation {
    pub fn outbound_total(&self) -> f64 {
        self.routes.values().sum()
    }

    /// Recomputed load and latency limit agree with the solver's evaluation
    pub fn matches_solver(&self) -> bool {
        agrees(self.incoming_load, self.solver_incoming_load) && agrees(self.latency_limit, self.solver_latency_limit)
    }
}

/// Complete solved plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub regions: Vec<RegionAllocation>,

    /// Sum of instance counts x monthly cost, recomputed client-side
    pub total_cost: f64,

    /// Objective value reported by the solver
    pub solver_objective: f64,

    pub budget: f64,
}

impl CapacityPlan {
    pub fn region(&self, id: &RegionId) -> Option<&RegionAllocation> {
        self.regions.iter().find(|allocation| &allocation.region == id)
    }

    /// Recomputed cost and solver objective agree within [`COST_TOLERANCE`]
    pub fn cost_matches_objective(&self) -> bool {
        agrees(self.total_cost, self.solver_objective)
    }

    pub fn has_non_integral_counts(&self) -> bool {
        self.regions.iter().any(|allocation| allocation.non_integral)
    }
}

/// Result of a full planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Optimal(CapacityPlan),
    Infeasible,
    Unbounded,
    Inconclusive { reason: String },
}

impl PlanOutcome {
    pub fn plan(&self) -> Option<&CapacityPlan> {
        match self {
            PlanOutcome::Optimal(plan) => Some(plan),
            _ => None,
        }
    }
}

/// Read every region's allocation out of a solved model
pub fn extract(solved: &SolvedModel, scenario: &Scenario) -> Result<CapacityPlan> {
    let config = &scenario.planner;
    let mut regions = Vec::with_capacity(scenario.regions.len());

    for destination in &scenario.regions {
        let id = &destination.name;

        let count = |size| solved.instances(id, size).ok_or_else(|| CapacityError::RegionNotFound(id.clone()));
        let raw_instances = SizeTable::new(
            count(InstanceSize::Small)?,
            count(InstanceSize::Medium)?,
            count(InstanceSize::Large)?,
        );
        let non_integral = raw_instances
            .iter()
            .any(|(_, count)| (count - count.round()).abs() > INTEGRALITY_TOLERANCE);
        if non_integral {
            warn!(region = %id, ?raw_instances, "Solver returned non-integral instance counts");
        }
        let instances = SizeTable::new(
            round_count(raw_instances.small),
            round_count(raw_instances.medium),
            round_count(raw_instances.large),
        );

        let routes = scenario
            .regions
            .iter()
            .map(|to| route(solved, id, &to.name).map(|fraction| (to.name.clone(), fraction)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let incoming_load = scenario
            .regions
            .iter()
            .map(|source| route(solved, &source.name, id).map(|fraction| fraction * source.base_load as f64))
            .sum::<Result<f64>>()?;
        let capacity = raw_instances.dot(&config.compute_units);
        let latency_limit = capacity * config.max_latency * config.latency_factor(destination.critical);

        let readings = solved
            .readings(id)
            .ok_or_else(|| CapacityError::RegionNotFound(id.clone()))?;

        let allocation = RegionAllocation {
            region: id.clone(),
            critical: destination.critical,
            instances,
            raw_instances,
            non_integral,
            routes,
            incoming_load,
            capacity,
            latency_limit,
            weighted_latency: incoming_load * destination.base_latency,
            solver_incoming_load: readings.incoming_load,
            solver_latency_limit: readings.latency_limit,
            monthly_cost: raw_instances.dot(&config.monthly_cost),
        };
        if !allocation.matches_solver() {
            warn!(
                region = %id,
                incoming_load,
                solver_incoming_load = readings.incoming_load,
                latency_limit,
                solver_latency_limit = readings.latency_limit,
                "Recomputed region terms disagree with solver evaluation"
            );
        }
        regions.push(allocation);
    }

    let total_cost = regions.iter().map(|allocation| allocation.monthly_cost).sum();
    let plan = CapacityPlan {
        regions,
        total_cost,
        solver_objective: solved.objective,
        budget: config.monthly_budget,
    };

    if !plan.cost_matches_objective() {
        warn!(
            total_cost = plan.total_cost,
            solver_objective = plan.solver_objective,
            "Recomputed cost disagrees with solver objective"
        );
    }

    Ok(plan)
}

fn route(solved: &SolvedModel, from: &RegionId, to: &RegionId) -> Result<f64> {
    solved
        .route(from, to)
        .ok_or_else(|| CapacityError::RegionNotFound(from.clone()))
}

fn round_count(raw: f64) -> u64 {
    raw.round().max(0.0) as u64
}

/// Validate, build, solve and extract in one call
pub fn plan(scenario: &Scenario) -> Result<PlanOutcome> {
    let backend = scenario.planner.solver;
    if !backend_available(backend) {
        return Err(CapacityError::solver_unavailable(format!(
            "backend '{}' is not compiled into this build",
            backend
        )));
    }

    let model = CapacityModel::build(scenario)?;

    let outcome = match solve(model, scenario.planner.solver)? {
        Outcome::Optimal(solved) => {
            let plan = extract(&solved, scenario)?;
            info!(total_cost = plan.total_cost, budget = plan.budget, "Optimal plan found");
            PlanOutcome::Optimal(plan)
        }
        Outcome::Infeasible => PlanOutcome::Infeasible,
        Outcome::Unbounded => PlanOutcome::Unbounded,
        Outcome::Inconclusive(reason) => PlanOutcome::Inconclusive { reason },
    };

    Ok(outcome)
}

#[cfg(all(test, feature = "microlp"))]
mod tests {
    use super::*;
    use capplan_core::{PlannerConfig, Region, SolverBackend};

    const TOL: f64 = 1e-6;

    fn optimal(scenario: &Scenario) -> CapacityPlan {
        match plan(scenario).unwrap() {
            PlanOutcome::Optimal(plan) => plan,
            other => panic!("expected optimal plan, got {:?}", other),
        }
    }

    fn assert_plan_feasible(plan: &CapacityPlan, scenario: &Scenario) {
        let config = &scenario.planner;

        assert!(plan.total_cost <= config.monthly_budget + TOL);
        assert!(plan.cost_matches_objective());
        assert!(!plan.has_non_integral_counts());

        for allocation in &plan.regions {
            assert!(allocation.matches_solver(), "{} solver terms", allocation.region);
            assert!((allocation.outbound_total() - 1.0).abs() < TOL, "{} routes", allocation.region);
            assert!(allocation.capacity >= config.min_capacity_per_region - TOL);
            assert!(allocation.weighted_latency <= allocation.latency_limit * (1.0 + TOL) + TOL);
            for fraction in allocation.routes.values() {
                assert!(*fraction >= -TOL && *fraction <= 1.0 + TOL);
            }
        }

        // Routed load is conserved across the whole deployment
        let originating: f64 = scenario.regions.iter().map(|r| r.base_load as f64).sum();
        let served: f64 = plan.regions.iter().map(|a| a.incoming_load).sum();
        assert!((originating - served).abs() < 1e-3);
    }

    #[test]
    fn test_reference_plan_respects_every_constraint() {
        let scenario = Scenario::reference();
        let plan = optimal(&scenario);

        assert_eq!(plan.regions.len(), 4);
        assert!(plan.total_cost <= 15_000.0);
        for allocation in &plan.regions {
            assert!(allocation.capacity >= 1000.0 - TOL);
        }
        assert_plan_feasible(&plan, &scenario);
    }

    #[test]
    fn test_recomputed_terms_match_solver_evaluation() {
        let scenario = Scenario::reference();
        let plan = optimal(&scenario);

        for allocation in &plan.regions {
            assert!((allocation.incoming_load - allocation.solver_incoming_load).abs() < 1e-6);
            assert!((allocation.latency_limit - allocation.solver_latency_limit).abs() < 1e-6);
        }
        let served: f64 = plan.regions.iter().map(|a| a.solver_incoming_load).sum();
        assert!((served - 16_450.0).abs() < 1e-3);
    }

    #[test]
    fn test_critical_regions_use_tightened_limit() {
        let scenario = Scenario::reference();
        let plan = optimal(&scenario);

        let us_east = plan.region(&RegionId::new("UsEast")).unwrap();
        assert!(us_east.critical);
        assert!((us_east.latency_limit - us_east.capacity * 30.0 * 0.8).abs() < 1e-6);

        let asia = plan.region(&RegionId::new("Asia")).unwrap();
        assert!(!asia.critical);
        assert!((asia.latency_limit - asia.capacity * 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_recomputed_cost_matches_instance_counts() {
        let scenario = Scenario::reference();
        let plan = optimal(&scenario);

        let from_counts: f64 = plan
            .regions
            .iter()
            .map(|a| {
                a.instances.small as f64 * 36.5 + a.instances.medium as f64 * 36.5 + a.instances.large as f64 * 146.0
            })
            .sum();
        assert!((from_counts - plan.total_cost).abs() < 1e-3);
        assert!((plan.total_cost - plan.solver_objective).abs() < 1e-3);
    }

    #[test]
    fn test_single_region_keeps_its_own_traffic() {
        let scenario = Scenario::new(PlannerConfig::default(), vec![Region::new("Solo", 100, 10.0)]);
        let plan = optimal(&scenario);

        let solo = &plan.regions[0];
        assert!((solo.routes[&RegionId::new("Solo")] - 1.0).abs() < TOL);
        assert!((solo.incoming_load - 100.0).abs() < TOL);
        // 1000 CU floor dominates the 100 * 10 / 30 latency requirement: 7 medium instances
        assert!(solo.capacity >= 1000.0 - TOL);
        assert!((plan.total_cost - 7.0 * 36.5).abs() < 1e-6);
        assert_plan_feasible(&plan, &scenario);
    }

    #[test]
    fn test_custom_constants_change_the_optimum() {
        let mut scenario = Scenario::reference();
        // Large instances now dominate on cost per CU
        scenario.planner.monthly_cost = SizeTable::new(36.5, 73.0, 60.0);
        let plan = optimal(&scenario);

        assert_plan_feasible(&plan, &scenario);
        let large: u64 = plan.regions.iter().map(|a| a.instances.large).sum();
        assert!(large > 0);
    }

    #[test]
    fn test_unreachable_floor_reports_infeasible() {
        let mut scenario = Scenario::reference();
        scenario.planner.min_capacity_per_region = 250_000.0;

        let outcome = plan(&scenario).unwrap();
        assert!(matches!(outcome, PlanOutcome::Infeasible));
        assert!(outcome.plan().is_none());
    }

    #[test]
    fn test_extract_against_other_scenario_fails() {
        let solved = match solve(CapacityModel::build(&Scenario::reference()).unwrap(), Default::default()).unwrap() {
            Outcome::Optimal(solved) => solved,
            other => panic!("expected optimal outcome, got {}", other.status()),
        };
        let other = Scenario::new(PlannerConfig::default(), vec![Region::new("Mars", 10, 1.0)]);

        assert!(matches!(extract(&solved, &other), Err(CapacityError::RegionNotFound(_))));
    }

    #[test]
    fn test_invalid_scenario_is_an_error() {
        let mut scenario = Scenario::reference();
        scenario.regions[1].base_latency = 0.0;
        assert!(matches!(plan(&scenario), Err(CapacityError::Config(_))));
    }

    #[cfg(not(feature = "highs"))]
    #[test]
    fn test_missing_backend_fails_before_validation() {
        let mut scenario = Scenario::reference();
        scenario.planner.solver = SolverBackend::Highs;
        scenario.regions[1].base_latency = 0.0;

        assert!(matches!(plan(&scenario), Err(CapacityError::SolverUnavailable(_))));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(PlanOutcome::Inconclusive { reason: "time limit".into() }).unwrap();
        assert_eq!(json["status"], "inconclusive");
        assert_eq!(json["reason"], "time limit");

        let plan = optimal(&Scenario::reference());
        let json = serde_json::to_value(PlanOutcome::Optimal(plan)).unwrap();
        assert_eq!(json["status"], "optimal");
        assert_eq!(json["regions"].as_array().unwrap().len(), 4);
    }
}
