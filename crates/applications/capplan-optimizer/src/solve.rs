//! Solver invocation
//!
//! Hands a [`CapacityModel`] to a `good_lp` backend and classifies the result.
//! Values are only read after the backend reports an optimal solution; every
//! other status becomes an [`Outcome`] variant without values.

use std::collections::HashMap;

use capplan_core::{CapacityError, InstanceSize, RegionId, Result, SolverBackend};
use good_lp::{Constraint, Expression, IntoAffineExpression, ResolutionError, Solution, SolverModel};
use tracing::{debug, info, warn};

use crate::model::{CapacityModel, ConstraintKind};
use crate::region::{RegionTerms, RegionVars};

/// Identity of one decision variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecisionKey {
    Instances { region: RegionId, size: InstanceSize },
    Route { from: RegionId, to: RegionId },
}

impl DecisionKey {
    pub fn instances(region: &RegionId, size: InstanceSize) -> Self {
        DecisionKey::Instances { region: region.clone(), size }
    }

    pub fn route(from: &RegionId, to: &RegionId) -> Self {
        DecisionKey::Route { from: from.clone(), to: to.clone() }
    }
}

/// Derived expressions of one region as evaluated against the solution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionReadings {
    pub incoming_load: f64,
    pub capacity: f64,
    pub latency_limit: f64,
}

impl RegionReadings {
    fn evaluate(terms: &RegionTerms, solution: &impl Solution) -> Self {
        RegionReadings {
            incoming_load: terms.incoming_load.clone().eval_with(solution),
            capacity: terms.capacity.clone().eval_with(solution),
            latency_limit: terms.latency_limit.clone().eval_with(solution),
        }
    }
}

/// Values of every decision variable at the solver's optimum
#[derive(Debug, Clone)]
pub struct SolvedModel {
    values: HashMap<DecisionKey, f64>,
    readings: HashMap<RegionId, RegionReadings>,

    /// Objective as evaluated by the solver-side expression
    pub objective: f64,
}

impl SolvedModel {
    pub fn value(&self, key: &DecisionKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn instances(&self, region: &RegionId, size: InstanceSize) -> Option<f64> {
        self.value(&DecisionKey::instances(region, size))
    }

    pub fn route(&self, from: &RegionId, to: &RegionId) -> Option<f64> {
        self.value(&DecisionKey::route(from, to))
    }

    /// Solver-side load, capacity and latency limit of `region`
    pub fn readings(&self, region: &RegionId) -> Option<RegionReadings> {
        self.readings.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Classified result of one solve
#[derive(Debug, Clone)]
pub enum Outcome {
    Optimal(SolvedModel),
    Infeasible,
    Unbounded,
    /// The solver stopped without certifying an optimum
    Inconclusive(String),
}

impl Outcome {
    pub fn is_optimal(&self) -> bool {
        matches!(self, Outcome::Optimal(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Optimal(_) => "optimal",
            Outcome::Infeasible => "infeasible",
            Outcome::Unbounded => "unbounded",
            Outcome::Inconclusive(_) => "inconclusive",
        }
    }
}

/// Whether `backend` is compiled into this build
pub fn backend_available(backend: SolverBackend) -> bool {
    match backend {
        SolverBackend::Microlp => cfg!(feature = "microlp"),
        SolverBackend::Highs => cfg!(feature = "highs"),
    }
}

/// Solve `model` with `backend`
///
/// Only a missing backend is an error; infeasibility and other statuses are
/// reported through [`Outcome`].
pub fn solve(model: CapacityModel, backend: SolverBackend) -> Result<Outcome> {
    if !backend_available(backend) {
        return Err(CapacityError::solver_unavailable(format!(
            "backend '{}' is not compiled into this build",
            backend
        )));
    }

    info!(
        %backend,
        integer_vars = model.integer_variable_count(),
        continuous_vars = model.continuous_variable_count(),
        constraints = model.constraint_count(),
        "Solving capacity model"
    );

    let CapacityModel {
        vars,
        regions,
        terms,
        constraints,
        objective,
    } = model;
    let problem = vars.minimise(objective.clone());

    match backend {
        #[cfg(feature = "microlp")]
        SolverBackend::Microlp => Ok(solve_with(
            problem.using(good_lp::solvers::microlp::microlp),
            &regions,
            &terms,
            constraints,
            &objective,
        )),
        #[cfg(feature = "highs")]
        SolverBackend::Highs => Ok(solve_with(
            problem.using(good_lp::solvers::highs::highs),
            &regions,
            &terms,
            constraints,
            &objective,
        )),
        #[allow(unreachable_patterns)]
        other => Err(CapacityError::solver_unavailable(other.to_string())),
    }
}

fn solve_with<M>(
    problem: M,
    regions: &[RegionVars],
    terms: &[RegionTerms],
    constraints: Vec<(ConstraintKind, Constraint)>,
    objective: &Expression,
) -> Outcome
where
    M: SolverModel<Error = ResolutionError>,
{
    let problem = constraints
        .into_iter()
        .fold(problem, |problem, (_, constraint)| problem.with(constraint));

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            info!("Model is infeasible");
            return Outcome::Infeasible;
        }
        Err(ResolutionError::Unbounded) => {
            warn!("Model is unbounded");
            return Outcome::Unbounded;
        }
        Err(err) => {
            warn!(error = %err, "Solver stopped without an optimal solution");
            return Outcome::Inconclusive(err.to_string());
        }
    };

    let mut values = HashMap::with_capacity(regions.len() * (3 + regions.len()));
    for region in regions {
        for (size, var) in region.instances.iter() {
            values.insert(DecisionKey::instances(region.id(), size), solution.value(var));
        }
        for (destination, var) in region.routes.iter() {
            values.insert(DecisionKey::route(region.id(), destination), solution.value(var));
        }
    }

    let readings = terms
        .iter()
        .map(|term| (term.region.clone(), RegionReadings::evaluate(term, &solution)))
        .collect();

    let objective = objective.clone().eval_with(&solution);
    debug!(objective, variables = values.len(), "Optimal solution read back");

    Outcome::Optimal(SolvedModel {
        values,
        readings,
        objective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capplan_core::{PlannerConfig, Region, Scenario};

    #[cfg(feature = "microlp")]
    #[test]
    fn test_reference_scenario_is_optimal() {
        let scenario = Scenario::reference();
        let model = CapacityModel::build(&scenario).unwrap();

        match solve(model, SolverBackend::Microlp).unwrap() {
            Outcome::Optimal(solved) => {
                assert_eq!(solved.len(), 4 * 3 + 4 * 4);
                assert!(solved.objective <= 15_000.0 + 1e-6);
                for region in &scenario.regions {
                    assert!(solved.instances(&region.name, InstanceSize::Medium).is_some());
                    assert!(solved.route(&region.name, &region.name).is_some());

                    let readings = solved.readings(&region.name).unwrap();
                    assert!(readings.capacity >= 1000.0 - 1e-6);
                    assert!(readings.incoming_load * region.base_latency <= readings.latency_limit * (1.0 + 1e-6) + 1e-6);
                }
                assert!(solved.readings(&RegionId::new("Mars")).is_none());
            }
            other => panic!("expected optimal outcome, got {}", other.status()),
        }
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn test_unreachable_floor_is_infeasible() {
        let mut scenario = Scenario::reference();
        // Each region alone would need more than the whole budget
        scenario.planner.min_capacity_per_region = 1_000_000.0;
        let model = CapacityModel::build(&scenario).unwrap();

        let outcome = solve(model, SolverBackend::Microlp).unwrap();
        assert!(matches!(outcome, Outcome::Infeasible));
        assert!(!outcome.is_optimal());
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn test_zero_budget_is_infeasible() {
        let mut planner = PlannerConfig::default();
        planner.monthly_budget = 0.0;
        let scenario = Scenario::new(planner, vec![Region::new("Solo", 100, 10.0)]);
        let model = CapacityModel::build(&scenario).unwrap();

        assert_eq!(solve(model, SolverBackend::Microlp).unwrap().status(), "infeasible");
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn test_solving_twice_gives_same_objective() {
        let scenario = Scenario::reference();
        let first = solve(CapacityModel::build(&scenario).unwrap(), SolverBackend::Microlp).unwrap();
        let second = solve(CapacityModel::build(&scenario).unwrap(), SolverBackend::Microlp).unwrap();

        match (first, second) {
            (Outcome::Optimal(a), Outcome::Optimal(b)) => {
                assert!((a.objective - b.objective).abs() < 1e-6);
            }
            _ => panic!("reference scenario should solve to optimality"),
        }
    }

    #[cfg(not(feature = "highs"))]
    #[test]
    fn test_missing_backend_is_reported() {
        let model = CapacityModel::build(&Scenario::reference()).unwrap();

        assert!(!backend_available(SolverBackend::Highs));
        assert!(matches!(
            solve(model, SolverBackend::Highs),
            Err(CapacityError::SolverUnavailable(_))
        ));
    }
}
