use super::context::extract_context;
use super::domain::{
    ParameterDomainError, ParameterResolutionResult, ParameterSchema, ParameterValue,
    ResolutionSource, UnresolvedParameter,
};
use super::relevance::calculate_relevance;
use crate::config::ResolutionConfig;
use crate::provider::{EmbeddingError, EmbeddingProvider};
use crate::store::{ParameterStore, ParameterStoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("parameter `{name}` schema invalid: {source}")]
    InvalidSchema {
        name: String,
        #[source]
        source: ParameterDomainError,
    },
    #[error("parameter store error: {0}")]
    Store(#[from] ParameterStoreError),
    #[error("embedding provider error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("parameter entity invariant violated: {0}")]
    Domain(ParameterDomainError),
}

/// One resolution pass: the prompt, the already-selected workflow, the
/// workflow's declared parameter schemas, and any values the caller already
/// extracted from structured input.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub prompt: String,
    pub workflow_name: String,
    pub parameters: BTreeMap<String, ParameterSchema>,
    pub existing_modifiers: BTreeMap<String, ParameterValue>,
}

/// Orchestrates the three-tier resolution algorithm per parameter and
/// validates/persists values supplied later by the agent.
pub struct ParameterResolver {
    store: ParameterStore,
    embedder: Arc<dyn EmbeddingProvider>,
    config: ResolutionConfig,
}

impl ParameterResolver {
    pub fn new(store: ParameterStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            config: ResolutionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Applies the tiers in strict priority order per parameter; the first
    /// tier that produces a value wins:
    ///
    /// 1. caller-supplied modifier (authoritative, source `yaml_modifier`);
    /// 2. learned mapping above the reuse threshold (source `learned`,
    ///    bumps the mapping's usage count exactly once);
    /// 3. relevance gate: a prompt that is about the parameter yields an
    ///    unresolved entry to surface as a question, anything else falls
    ///    back to the schema default (source `default`).
    ///
    /// Ordinary information gaps never fail the call; only schema
    /// misconfiguration and provider errors do.
    pub fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<ParameterResolutionResult, ResolveError> {
        let mut result = ParameterResolutionResult::default();

        for (name, schema) in &request.parameters {
            schema
                .validate()
                .map_err(|source| ResolveError::InvalidSchema {
                    name: name.clone(),
                    source,
                })?;

            if let Some(value) = request.existing_modifiers.get(name) {
                result.resolved.insert(name.clone(), value.clone());
                result
                    .resolution_sources
                    .insert(name.clone(), ResolutionSource::YamlModifier);
                continue;
            }

            if let Some(mapping) = self.store.find_mapping(
                &request.prompt,
                name,
                &request.workflow_name,
                Some(self.config.reuse_threshold),
            )? {
                self.store.increment_usage(&mapping)?;
                result.resolved.insert(name.clone(), mapping.value);
                result
                    .resolution_sources
                    .insert(name.clone(), ResolutionSource::Learned);
                continue;
            }

            let relevance = calculate_relevance(
                self.embedder.as_ref(),
                &request.prompt,
                schema,
                self.config.literal_hint_boost,
            )?;

            // A schema without a default has nothing to fall back to, so it
            // is surfaced as a question regardless of relevance.
            if relevance > self.config.relevance_threshold || schema.default.is_none() {
                let context =
                    extract_context(&request.prompt, schema, &self.config.extraction);
                let unresolved =
                    UnresolvedParameter::new(name.clone(), schema.clone(), context, relevance)
                        .map_err(ResolveError::Domain)?;
                result.unresolved.push(unresolved);
                continue;
            }

            if let Some(default) = &schema.default {
                result.resolved.insert(name.clone(), default.clone());
                result
                    .resolution_sources
                    .insert(name.clone(), ResolutionSource::Default);
            }
        }

        Ok(result)
    }

    /// Persists an agent-supplied answer for a previously surfaced question.
    /// A value failing schema validation yields a human-readable
    /// `"Error: invalid value …"` string and skips the store write
    /// entirely; provider/index failures propagate as errors.
    pub fn store_resolved_value(
        &self,
        context: &str,
        parameter_name: &str,
        value: &ParameterValue,
        workflow_name: &str,
        schema: Option<&ParameterSchema>,
    ) -> Result<String, ParameterStoreError> {
        if let Some(schema) = schema {
            if !schema.validate_value(value) {
                return Ok(validation_failure_message(parameter_name, schema, value));
            }
        }

        self.store
            .store_mapping(context, parameter_name, value, workflow_name)?;
        Ok(format!(
            "Stored `{parameter_name}` = {value} for workflow `{workflow_name}`"
        ))
    }
}

fn validation_failure_message(
    parameter_name: &str,
    schema: &ParameterSchema,
    value: &ParameterValue,
) -> String {
    let mut constraint = format!("type {}", schema.value_type.as_str());
    if let Some((min, max)) = schema.range {
        constraint.push_str(&format!(" in range {min}..={max}"));
    }
    if let Some(choices) = &schema.choices {
        let rendered = choices
            .iter()
            .map(ParameterValue::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        constraint.push_str(&format!(" from enum [{rendered}]"));
    }
    format!(
        "Error: invalid value for `{parameter_name}`: expected {constraint}; got {value} ({})",
        value.type_label()
    )
}
