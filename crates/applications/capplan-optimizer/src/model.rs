//! Capacity model builder
//!
//! Translates a [`Scenario`] into a mixed-integer program:
//!
//! 1. integer instance counts per region and size, continuous routing
//!    fractions per ordered region pair
//! 2. routing fractions of each source sum to exactly 1
//! 3. one global budget constraint on the summed monthly cost
//! 4. per destination: a CU floor, and the linear latency surrogate
//!    `incoming_load * base_latency <= capacity * max_latency * factor`
//! 5. minimize the same cost expression used by the budget constraint

use capplan_core::{Result, Scenario};
use good_lp::{constraint, Constraint, Expression, ProblemVariables};
use tracing::debug;

use crate::region::{cost_expression, RegionTerms, RegionVars};

/// Family a registered constraint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Routing,
    Budget,
    CapacityFloor,
    Latency,
}

/// A fully built model, consumed once by [`crate::solve::solve`]
pub struct CapacityModel {
    pub(crate) vars: ProblemVariables,
    pub(crate) regions: Vec<RegionVars>,
    pub(crate) terms: Vec<RegionTerms>,
    pub(crate) constraints: Vec<(ConstraintKind, Constraint)>,
    pub(crate) objective: Expression,
}

impl CapacityModel {
    /// Validate the scenario and build its model
    pub fn build(scenario: &Scenario) -> Result<Self> {
        ModelBuilder::new(scenario).build()
    }

    pub fn regions(&self) -> &[RegionVars] {
        &self.regions
    }

    pub fn terms(&self) -> &[RegionTerms] {
        &self.terms
    }

    pub fn integer_variable_count(&self) -> usize {
        self.regions.len() * 3
    }

    pub fn continuous_variable_count(&self) -> usize {
        self.regions.iter().map(|region| region.routes.len()).sum()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraint_count_of(&self, kind: ConstraintKind) -> usize {
        self.constraints.iter().filter(|(k, _)| *k == kind).count()
    }
}

/// Builds a [`CapacityModel`] step by step from a scenario
pub struct ModelBuilder<'a> {
    scenario: &'a Scenario,
    vars: ProblemVariables,
    constraints: Vec<(ConstraintKind, Constraint)>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        ModelBuilder {
            scenario,
            vars: ProblemVariables::new(),
            constraints: Vec::new(),
        }
    }

    pub fn build(mut self) -> Result<CapacityModel> {
        // Region names key the variables, so duplicates must fail before any are created
        self.scenario.validate()?;

        let regions = self.declare_variables();
        self.add_routing_constraints(&regions);
        self.add_budget_constraint(&regions);
        let terms = self.add_region_constraints(&regions);
        let objective = cost_expression(&regions, &self.scenario.planner);

        debug!(
            regions = regions.len(),
            constraints = self.constraints.len(),
            "Capacity model built"
        );

        Ok(CapacityModel {
            vars: self.vars,
            regions,
            terms,
            constraints: self.constraints,
            objective,
        })
    }

    fn declare_variables(&mut self) -> Vec<RegionVars> {
        let scenario = self.scenario;
        let all = &scenario.regions;
        all.iter()
            .map(|region| RegionVars::declare(&mut self.vars, region, all))
            .collect()
    }

    fn add_routing_constraints(&mut self, regions: &[RegionVars]) {
        for source in regions {
            let routed = source.routes.outbound_sum();
            self.push(ConstraintKind::Routing, constraint!(routed == 1.0));
        }
    }

    fn add_budget_constraint(&mut self, regions: &[RegionVars]) {
        let total_cost = cost_expression(regions, &self.scenario.planner);
        let budget = self.scenario.planner.monthly_budget;
        self.push(ConstraintKind::Budget, constraint!(total_cost <= budget));
    }

    fn add_region_constraints(&mut self, regions: &[RegionVars]) -> Vec<RegionTerms> {
        let scenario = self.scenario;
        let config = &scenario.planner;
        let min_capacity = config.min_capacity_per_region;

        let terms: Vec<RegionTerms> = regions
            .iter()
            .map(|destination| RegionTerms::derive(destination, regions, config))
            .collect();

        let mut constraints = Vec::with_capacity(terms.len() * 2);
        for (destination, term) in regions.iter().zip(&terms) {
            let capacity = term.capacity.clone();
            constraints.push((ConstraintKind::CapacityFloor, constraint!(capacity >= min_capacity)));

            let weighted_load = term.incoming_load.clone() * destination.region.base_latency;
            let latency_limit = term.latency_limit.clone();
            constraints.push((ConstraintKind::Latency, constraint!(weighted_load <= latency_limit)));
        }
        self.constraints.extend(constraints);

        terms
    }

    fn push(&mut self, kind: ConstraintKind, constraint: Constraint) {
        self.constraints.push((kind, constraint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capplan_core::{CapacityError, Region};

    #[test]
    fn test_reference_model_shape() {
        let model = CapacityModel::build(&Scenario::reference()).unwrap();

        assert_eq!(model.regions().len(), 4);
        assert_eq!(model.integer_variable_count(), 12);
        assert_eq!(model.continuous_variable_count(), 16);

        assert_eq!(model.constraint_count_of(ConstraintKind::Routing), 4);
        assert_eq!(model.constraint_count_of(ConstraintKind::Budget), 1);
        assert_eq!(model.constraint_count_of(ConstraintKind::CapacityFloor), 4);
        assert_eq!(model.constraint_count_of(ConstraintKind::Latency), 4);
        assert_eq!(model.constraint_count(), 13);
    }

    #[test]
    fn test_duplicate_names_fail_before_building() {
        let mut scenario = Scenario::reference();
        scenario.regions.push(Region::new("UsWest", 10, 10.0));

        assert!(matches!(
            CapacityModel::build(&scenario),
            Err(CapacityError::DuplicateRegion(_))
        ));
    }

    #[test]
    fn test_single_region_model() {
        let scenario = Scenario::new(Default::default(), vec![Region::new("Solo", 100, 10.0)]);
        let model = CapacityModel::build(&scenario).unwrap();

        assert_eq!(model.continuous_variable_count(), 1);
        assert_eq!(model.constraint_count(), 4);
        assert_eq!(model.terms()[0].region.as_str(), "Solo");
    }
}
