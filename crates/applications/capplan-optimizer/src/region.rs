//! Per-region decision variables and derived linear expressions
//!
//! Each region owns three integer instance-count variables and one routing
//! fraction per destination. Load, capacity and latency budget are not
//! variables: they are linear expressions folded from those variables once,
//! at build time.

use std::collections::HashMap;

use capplan_core::{InstanceSize, PlannerConfig, Region, RegionId, SizeTable};
use good_lp::{variable, Expression, ProblemVariables, Variable};

/// Outbound routing fractions of one source region, keyed by destination
#[derive(Debug, Clone, Default)]
pub struct RouteTable(HashMap<RegionId, Variable>);

impl RouteTable {
    pub fn get(&self, destination: &RegionId) -> Option<Variable> {
        self.0.get(destination).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, Variable)> + '_ {
        self.0.iter().map(|(destination, var)| (destination, *var))
    }

    /// Sum of every outbound fraction, self-route included
    pub fn outbound_sum(&self) -> Expression {
        self.0.values().fold(Expression::from(0.0), |acc, var| acc + *var)
    }
}

/// Decision variables owned by one region
#[derive(Debug, Clone)]
pub struct RegionVars {
    pub region: Region,
    pub instances: SizeTable<Variable>,
    pub routes: RouteTable,
}

impl RegionVars {
    /// Declare the instance counts of `region` and its routes to every region in `all`
    pub fn declare(vars: &mut ProblemVariables, region: &Region, all: &[Region]) -> Self {
        let mut instance = |size: InstanceSize| {
            vars.add(variable().integer().min(0).name(format!("{}_{}", size, region.name)))
        };
        let instances = SizeTable::new(
            instance(InstanceSize::Small),
            instance(InstanceSize::Medium),
            instance(InstanceSize::Large),
        );

        let routes = all
            .iter()
            .map(|destination| {
                let var = vars.add(
                    variable()
                        .min(0.0)
                        .max(1.0)
                        .name(format!("traffic_{}_to_{}", region.name, destination.name)),
                );
                (destination.name.clone(), var)
            })
            .collect();

        RegionVars {
            region: region.clone(),
            instances,
            routes: RouteTable(routes),
        }
    }

    pub fn id(&self) -> &RegionId {
        &self.region.name
    }

    /// Instance variables weighted per size (`cost` or CU yield)
    pub fn weighted_instances(&self, weights: &SizeTable<f64>) -> Expression {
        self.instances
            .iter()
            .fold(Expression::from(0.0), |acc, (size, var)| acc + var * weights.get(size))
    }

    /// Total compute units provisioned in this region
    pub fn capacity(&self, config: &PlannerConfig) -> Expression {
        self.weighted_instances(&config.compute_units)
    }
}

/// Derived expressions of one region acting as a destination
pub struct RegionTerms {
    pub region: RegionId,
    pub incoming_load: Expression,
    pub capacity: Expression,
    pub latency_limit: Expression,
}

impl RegionTerms {
    pub fn derive(destination: &RegionVars, sources: &[RegionVars], config: &PlannerConfig) -> Self {
        let capacity = destination.capacity(config);
        let latency_limit = capacity.clone() * (config.max_latency * config.latency_factor(destination.region.critical));

        RegionTerms {
            region: destination.id().clone(),
            incoming_load: incoming_load(destination.id(), sources),
            capacity,
            latency_limit,
        }
    }
}

/// Load routed into `destination`: sum over sources of fraction x source base load
pub fn incoming_load(destination: &RegionId, sources: &[RegionVars]) -> Expression {
    sources
        .iter()
        .filter_map(|source| {
            source
                .routes
                .get(destination)
                .map(|route| route * source.region.base_load as f64)
        })
        .fold(Expression::from(0.0), |acc, term| acc + term)
}

/// Monthly instance cost over every region; shared by the budget constraint and the objective
pub fn cost_expression(regions: &[RegionVars], config: &PlannerConfig) -> Expression {
    regions
        .iter()
        .fold(Expression::from(0.0), |acc, region| {
            acc + region.weighted_instances(&config.monthly_cost)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capplan_core::Scenario;

    fn declare_all(vars: &mut ProblemVariables, scenario: &Scenario) -> Vec<RegionVars> {
        scenario
            .regions
            .iter()
            .map(|region| RegionVars::declare(vars, region, &scenario.regions))
            .collect()
    }

    #[test]
    fn test_every_region_routes_to_every_destination() {
        let scenario = Scenario::reference();
        let mut vars = ProblemVariables::new();
        let regions = declare_all(&mut vars, &scenario);

        for source in &regions {
            assert_eq!(source.routes.len(), scenario.regions.len());
            for destination in &scenario.regions {
                assert!(source.routes.get(&destination.name).is_some());
            }
        }
        assert!(regions[0].routes.get(&RegionId::new("Mars")).is_none());
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn test_derived_expressions_evaluate() {
        use good_lp::{constraint, IntoAffineExpression, Solution, SolverModel};

        let scenario = Scenario::reference();
        let config = &scenario.planner;
        let mut vars = ProblemVariables::new();
        let regions = declare_all(&mut vars, &scenario);

        // Pin UsEast to 2 small + 1 large and route everything to UsEast
        let us_east = &regions[0];
        let mut pins = vec![
            constraint!(us_east.instances.small == 2.0),
            constraint!(us_east.instances.medium == 0.0),
            constraint!(us_east.instances.large == 1.0),
        ];
        for source in &regions {
            for (destination, route) in source.routes.iter() {
                let share = if destination == us_east.id() { 1.0 } else { 0.0 };
                pins.push(constraint!(route == share));
            }
        }

        let terms = RegionTerms::derive(us_east, &regions, config);
        let cost = cost_expression(&regions, config);

        let solution = pins
            .into_iter()
            .fold(vars.minimise(cost.clone()).using(good_lp::solvers::microlp::microlp), |model, c| {
                model.with(c)
            })
            .solve()
            .unwrap();

        // 2 * 50 + 300
        assert!((terms.capacity.clone().eval_with(&solution) - 400.0).abs() < 1e-6);
        // critical: 400 * 30 * 0.8
        assert!((terms.latency_limit.clone().eval_with(&solution) - 9600.0).abs() < 1e-6);
        // every region's base load lands in UsEast
        assert!((terms.incoming_load.clone().eval_with(&solution) - 16_450.0).abs() < 1e-6);
        // 2 * 36.5 + 146
        assert!((cost.eval_with(&solution) - 219.0).abs() < 1e-6);
        assert!((solution.value(us_east.instances.large) - 1.0).abs() < 1e-6);
    }
}
