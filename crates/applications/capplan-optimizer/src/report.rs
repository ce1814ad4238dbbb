//! Console rendering of planning results

use std::fmt;

use crate::plan::{CapacityPlan, PlanOutcome};

impl fmt::Display for CapacityPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution found:")?;
        writeln!(f)?;

        for allocation in &self.regions {
            let name = &allocation.region;
            let marker = if allocation.critical { " (critical)" } else { "" };

            writeln!(
                f,
                "{}{} - Small instances: {}, Medium instances: {}, Large instances: {}",
                name, marker, allocation.instances.small, allocation.instances.medium, allocation.instances.large
            )?;
            if allocation.non_integral {
                writeln!(
                    f,
                    "{} - WARNING: non-integral solver values {:.6}/{:.6}/{:.6}",
                    name,
                    allocation.raw_instances.small,
                    allocation.raw_instances.medium,
                    allocation.raw_instances.large
                )?;
            }
            writeln!(
                f,
                "{} - TotalLoad: {:.2} LatencyLimit: {:.2} Capacity: {:.0} CU",
                name, allocation.incoming_load, allocation.latency_limit, allocation.capacity
            )?;
            if !allocation.matches_solver() {
                writeln!(
                    f,
                    "{} - WARNING: solver evaluated TotalLoad: {:.2} LatencyLimit: {:.2}",
                    name, allocation.solver_incoming_load, allocation.solver_latency_limit
                )?;
            }
            for (destination, fraction) in &allocation.routes {
                writeln!(f, "{} - Routed traffic to {}: {:.4}", name, destination, fraction)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Total cost: {:.2} (budget {:.2})", self.total_cost, self.budget)?;
        if !self.cost_matches_objective() {
            writeln!(f, "WARNING: solver objective was {:.2}", self.solver_objective)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanOutcome::Optimal(plan) => write!(f, "{}", plan),
            PlanOutcome::Infeasible => writeln!(f, "No optimal solution found: model is infeasible."),
            PlanOutcome::Unbounded => writeln!(f, "No optimal solution found: model is unbounded."),
            PlanOutcome::Inconclusive { reason } => {
                writeln!(f, "No optimal solution found: solver stopped early ({}).", reason)
            }
        }
    }
}
