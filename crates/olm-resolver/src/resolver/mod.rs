//! SAT-based resolver: requests in, ordered install plans out

mod assembly;
pub mod hooks;
mod plan;
mod policy;
mod request;

use std::fmt;
use std::sync::Arc;

use crate::cache::{Entry, SharedCache};
use crate::config::ResolverConfig;
use crate::context::ResolveContext;
use crate::error::{InitError, ResolveError};
use crate::providers::{ConstraintProvider, ProviderKind};
use crate::solver::Solver;

use assembly::Assembler;
pub use hooks::InitHook;
pub use plan::{InstallPlan, Step};
pub use policy::Policy;
pub use request::{Request, Requirement};

/// Lifecycle of a resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Uninitialized,
    /// Init hooks are running
    Initializing,
    Ready,
}

/// Resolves requests against a catalog cache.
///
/// Built once through [`SatResolverBuilder`] and shared afterwards;
/// resolution only reads the cache snapshot and the providers, so one
/// resolver can serve concurrent requests.
pub struct SatResolver {
    state: ResolverState,
    cache: Arc<SharedCache>,
    providers: Vec<Arc<dyn ConstraintProvider>>,
    policy: Policy,
}

impl SatResolver {
    pub fn builder(cache: Arc<SharedCache>) -> SatResolverBuilder {
        SatResolverBuilder::new(cache)
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn cache(&self) -> &Arc<SharedCache> {
        &self.cache
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.providers.iter().any(|p| p.kind() == kind)
    }

    /// Kinds of the attached providers, in attachment order
    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Attach a constraint provider.
    ///
    /// # Panics
    ///
    /// Panics if a provider of the same kind is already attached.
    pub fn attach_provider(&mut self, provider: Arc<dyn ConstraintProvider>) {
        let kind = provider.kind();
        if self.has_provider(kind) {
            panic!("resolver already has a {} constraint provider defined", kind);
        }
        log::debug!("attaching {} constraint provider", kind);
        self.providers.push(provider);
    }

    /// Resolve a request into an ordered install plan.
    ///
    /// Fails with [`ResolveError::NotSatisfiable`] carrying the explanations
    /// of a minimal set of conflicting constraints when no plan exists.
    pub fn resolve(
        &self,
        request: &Request,
        ctx: &ResolveContext,
    ) -> Result<InstallPlan, ResolveError> {
        if self.state != ResolverState::Ready {
            return Err(ResolveError::NotReady);
        }
        ctx.check()?;

        let cache = self.cache.snapshot();
        log::debug!(
            "resolving {} requirement(s) and {} installed entries against {} cached entries",
            request.requirements.len(),
            request.installed.len(),
            cache.len()
        );

        let assembly =
            Assembler::new(&cache, &self.providers, &self.policy, ctx).assemble(request)?;
        let chosen = Solver::new(&assembly.variables, ctx).solve()?;

        let selected: Vec<Arc<Entry>> = chosen
            .iter()
            .filter_map(|id| assembly.entry(id).cloned())
            .collect();
        log::info!("resolved {} bundle(s)", selected.len());

        Ok(InstallPlan::build(selected, &assembly.dependencies, &request.installed))
    }
}

impl fmt::Debug for SatResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatResolver")
            .field("state", &self.state)
            .field("providers", &self.providers)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Configures and initializes a [`SatResolver`]
pub struct SatResolverBuilder {
    cache: Arc<SharedCache>,
    providers: Vec<Arc<dyn ConstraintProvider>>,
    hooks: Vec<InitHook>,
    policy: Policy,
}

impl SatResolverBuilder {
    pub fn new(cache: Arc<SharedCache>) -> Self {
        Self {
            cache,
            providers: Vec::new(),
            hooks: Vec::new(),
            policy: Policy::default(),
        }
    }

    /// Attach a provider before any hook runs
    pub fn with_provider(mut self, provider: Arc<dyn ConstraintProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Register a hook; hooks run in registration order
    pub fn with_init_hook(mut self, hook: InitHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Register the system and runtime constraint hooks for `config`
    pub fn with_config(mut self, config: &ResolverConfig) -> Self {
        self.hooks.extend(hooks::default_hooks(config));
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach the providers and run every init hook once.
    ///
    /// # Panics
    ///
    /// Panics if two providers of the same kind end up attached.
    pub fn build(self) -> Result<SatResolver, InitError> {
        let mut resolver = SatResolver {
            state: ResolverState::Uninitialized,
            cache: self.cache,
            providers: Vec::new(),
            policy: self.policy,
        };

        for provider in self.providers {
            resolver.attach_provider(provider);
        }

        resolver.state = ResolverState::Initializing;
        for (index, hook) in self.hooks.into_iter().enumerate() {
            hook(&mut resolver).map_err(|source| InitError::Hook { index, source })?;
        }
        resolver.state = ResolverState::Ready;

        log::debug!("resolver ready with providers {:?}", resolver.provider_kinds());
        Ok(resolver)
    }
}

impl fmt::Debug for SatResolverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatResolverBuilder")
            .field("providers", &self.providers)
            .field("hooks", &self.hooks.len())
            .field("policy", &self.policy)
            .finish()
    }
}
