//! SAT-based constraint solver.
//!
//! Variables carry constraints (mandatory, prohibited, dependency, conflict,
//! at-most-one). They are compiled into clauses and searched with unit
//! propagation and backtracking. Failures are reported as a minimal set of
//! constraints that cannot hold together.

mod constraint;
mod decisions;
mod problem;
mod rule;
mod rule_set;
#[allow(clippy::module_inception)]
mod solver;
mod watch_graph;

pub use constraint::{AppliedConstraint, Constraint, ConstraintKind, Identifier, Variable};
pub use problem::{NotSatisfiable, SolveError};
pub use solver::Solver;

pub(crate) use constraint::join;
