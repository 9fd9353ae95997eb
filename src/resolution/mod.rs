pub mod context;
pub mod domain;
pub mod relevance;
pub mod resolver;

pub use context::extract_context;
pub use domain::{
    ParameterDomainError, ParameterResolutionResult, ParameterSchema, ParameterType,
    ParameterValue, ResolutionSource, StoredMapping, UnresolvedParameter,
};
pub use relevance::calculate_relevance;
pub use resolver::{ParameterResolver, ResolutionRequest, ResolveError};
