use thiserror::Error;

use crate::context::Interrupted;
use crate::providers::{ProviderError, ProviderKind};
use crate::solver::{NotSatisfiable, SolveError};

/// Errors returned by [`crate::SatResolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolver is not initialized")]
    NotReady,

    #[error("{kind} constraint provider failed for {entry}: {source}")]
    Provider {
        kind: ProviderKind,
        entry: String,
        #[source]
        source: ProviderError,
    },

    #[error("constraints not satisfiable: {0}")]
    NotSatisfiable(NotSatisfiable),

    #[error("resolution cancelled")]
    Cancelled,

    #[error("resolution deadline exceeded")]
    DeadlineExceeded,

    /// The assembled constraints referenced variables inconsistently
    #[error("invalid constraint set: {0}")]
    Inconsistent(SolveError),
}

impl ResolveError {
    /// Explanations of the unsatisfiable constraints, if this is an UNSAT failure
    pub fn explanations(&self) -> Vec<String> {
        match self {
            ResolveError::NotSatisfiable(e) => e.explanations(),
            _ => Vec::new(),
        }
    }

    /// Check whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResolveError::Provider {
                source: ProviderError::Cluster(_),
                ..
            } | ResolveError::Cancelled
                | ResolveError::DeadlineExceeded
        )
    }
}

impl From<Interrupted> for ResolveError {
    fn from(e: Interrupted) -> Self {
        match e {
            Interrupted::Cancelled => ResolveError::Cancelled,
            Interrupted::DeadlineExceeded => ResolveError::DeadlineExceeded,
        }
    }
}

impl From<SolveError> for ResolveError {
    fn from(e: SolveError) -> Self {
        match e {
            SolveError::NotSatisfiable(e) => ResolveError::NotSatisfiable(e),
            SolveError::Interrupted(e) => e.into(),
            other => ResolveError::Inconsistent(other),
        }
    }
}

/// Errors raised while building a resolver
#[derive(Debug, Error)]
pub enum InitError {
    #[error("init hook {index} failed: {source:#}")]
    Hook {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ClusterError;

    #[test]
    fn test_interrupted_mapping() {
        let err: ResolveError = SolveError::Interrupted(Interrupted::Cancelled).into();
        assert!(matches!(err, ResolveError::Cancelled));

        let err: ResolveError = Interrupted::DeadlineExceeded.into();
        assert!(matches!(err, ResolveError::DeadlineExceeded));
        assert!(err.is_transient());
    }

    #[test]
    fn test_provider_error_message() {
        let err = ResolveError::Provider {
            kind: ProviderKind::PlatformVersion,
            entry: "anakin.v0.1.1".to_string(),
            source: ProviderError::Cluster(ClusterError::NilClient),
        };
        assert_eq!(
            err.to_string(),
            "platform version constraint provider failed for anakin.v0.1.1: nil client"
        );
        assert!(err.is_transient());
        assert!(err.explanations().is_empty());
    }
}
