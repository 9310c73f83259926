pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod providers;
pub mod resolver;
pub mod solver;

pub use cache::{Cache, CacheBuilder, CacheError, Entry, Predicate, Property, Scope, SharedCache};
pub use config::{ConfigLoader, ResolverConfig};
pub use context::{Interrupted, ResolveContext};
pub use error::{InitError, ResolveError};
pub use providers::{ConstraintProvider, ProviderError, ProviderKind};
pub use resolver::{
    InstallPlan, Policy, Request, Requirement, ResolverState, SatResolver, SatResolverBuilder, Step,
};
pub use solver::{Constraint, ConstraintKind, Identifier, NotSatisfiable};
