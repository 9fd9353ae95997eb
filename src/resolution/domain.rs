use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParameterDomainError {
    #[error("required field `{field}` must be non-empty")]
    MissingField { field: &'static str },
    #[error("range is only valid for numeric parameter types; got `{value_type}`")]
    RangeOnNonNumericType { value_type: &'static str },
    #[error("range minimum {min} exceeds maximum {max}")]
    RangeMinAboveMax { min: f64, max: f64 },
    #[error("enum must list at least one allowed value")]
    EmptyEnum,
    #[error("enum member {index} does not match parameter type `{value_type}`")]
    EnumMemberTypeMismatch {
        index: usize,
        value_type: &'static str,
    },
    #[error("default value is not a member of the enum")]
    DefaultOutsideEnum,
    #[error("default value fails the parameter's own type/range constraints")]
    DefaultInvalid,
    #[error("computed parameter `{name}` must not carry a default")]
    ComputedWithDefault { name: String },
    #[error("computed expression must be non-empty")]
    EmptyComputedExpression,
    #[error("computed parameter `{name}` requires at least one depends_on entry")]
    ComputedWithoutDependencies { name: String },
    #[error("similarity must be in range 0.0..=1.0; got {value}")]
    SimilarityOutOfRange { value: f32 },
    #[error("relevance must be in range 0.0..=1.0; got {value}")]
    RelevanceOutOfRange { value: f32 },
    #[error("usage_count must be >= 1; got {value}")]
    UsageCountOutOfRange { value: u64 },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Float,
    Int,
    Bool,
    #[serde(rename = "string")]
    Text,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::Float => "float",
            ParameterType::Int => "int",
            ParameterType::Bool => "bool",
            ParameterType::Text => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterType::Float | ParameterType::Int)
    }
}

/// A concrete value for one parameter. Untagged so YAML/JSON scalars map
/// directly: `true` -> Bool, `3` -> Int, `3.5` -> Float, `"oak"` -> Text.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    pub fn type_label(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Text(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(value) => Some(*value as f64),
            ParameterValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParameterValue::Bool(value) => Value::Bool(*value),
            ParameterValue::Int(value) => Value::Number(Number::from(*value)),
            ParameterValue::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ParameterValue::Text(value) => Value::String(value.clone()),
        }
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(value) => Some(ParameterValue::Bool(*value)),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Some(ParameterValue::Int(int))
                } else {
                    number.as_f64().map(ParameterValue::Float)
                }
            }
            Value::String(value) => Some(ParameterValue::Text(value.clone())),
            _ => None,
        }
    }

    /// Equality with numeric widening: `Int(2)` equals `Float(2.0)`.
    pub fn semantically_equals(&self, other: &ParameterValue) -> bool {
        match (self, other) {
            (ParameterValue::Bool(a), ParameterValue::Bool(b)) => a == b,
            (ParameterValue::Text(a), ParameterValue::Text(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Bool(value) => write!(f, "{value}"),
            ParameterValue::Int(value) => write!(f, "{value}"),
            ParameterValue::Float(value) => write!(f, "{value}"),
            ParameterValue::Text(value) => write!(f, "{value}"),
        }
    }
}

/// Immutable description of one tunable workflow value.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ParameterSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ParameterType,
    #[serde(default)]
    pub range: Option<(f64, f64)>,
    #[serde(default, rename = "enum")]
    pub choices: Option<Vec<ParameterValue>>,
    #[serde(default)]
    pub default: Option<ParameterValue>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub semantic_hints: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub computed: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ParameterSchema {
    pub fn validate(&self) -> Result<(), ParameterDomainError> {
        if self.name.trim().is_empty() {
            return Err(ParameterDomainError::MissingField { field: "name" });
        }

        if let Some((min, max)) = self.range {
            if !self.value_type.is_numeric() {
                return Err(ParameterDomainError::RangeOnNonNumericType {
                    value_type: self.value_type.as_str(),
                });
            }
            if min > max {
                return Err(ParameterDomainError::RangeMinAboveMax { min, max });
            }
        }

        if let Some(choices) = &self.choices {
            if choices.is_empty() {
                return Err(ParameterDomainError::EmptyEnum);
            }
            for (index, choice) in choices.iter().enumerate() {
                if !self.type_accepts(choice) {
                    return Err(ParameterDomainError::EnumMemberTypeMismatch {
                        index,
                        value_type: self.value_type.as_str(),
                    });
                }
            }
        }

        if let Some(expression) = &self.computed {
            if expression.trim().is_empty() {
                return Err(ParameterDomainError::EmptyComputedExpression);
            }
            if self.default.is_some() {
                return Err(ParameterDomainError::ComputedWithDefault {
                    name: self.name.clone(),
                });
            }
            if self.depends_on.is_empty() {
                return Err(ParameterDomainError::ComputedWithoutDependencies {
                    name: self.name.clone(),
                });
            }
        }

        if let Some(default) = &self.default {
            if let Some(choices) = &self.choices {
                if !choices
                    .iter()
                    .any(|choice| choice.semantically_equals(default))
                {
                    return Err(ParameterDomainError::DefaultOutsideEnum);
                }
            }
            if !self.validate_value(default) {
                return Err(ParameterDomainError::DefaultInvalid);
            }
        }

        Ok(())
    }

    /// Type, range and enum membership are enforced together; a value
    /// failing any one check is invalid.
    pub fn validate_value(&self, value: &ParameterValue) -> bool {
        if !self.type_accepts(value) {
            return false;
        }
        if let Some((min, max)) = self.range {
            match value.as_f64() {
                Some(number) if number >= min && number <= max => {}
                _ => return false,
            }
        }
        if let Some(choices) = &self.choices {
            if !choices
                .iter()
                .any(|choice| choice.semantically_equals(value))
            {
                return false;
            }
        }
        true
    }

    fn type_accepts(&self, value: &ParameterValue) -> bool {
        match self.value_type {
            // Int widens to float, never the reverse.
            ParameterType::Float => {
                matches!(value, ParameterValue::Float(_) | ParameterValue::Int(_))
            }
            ParameterType::Int => matches!(value, ParameterValue::Int(_)),
            ParameterType::Bool => matches!(value, ParameterValue::Bool(_)),
            ParameterType::Text => matches!(value, ParameterValue::Text(_)),
        }
    }
}

/// A durable association between an observed natural-language context and a
/// resolved value for one (workflow, parameter) pair. `similarity` is the
/// score produced when the mapping was retrieved, not an intrinsic property
/// of the record.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoredMapping {
    pub context: String,
    pub value: ParameterValue,
    pub similarity: f32,
    pub workflow_name: String,
    pub parameter_name: String,
    pub usage_count: u64,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl StoredMapping {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: String,
        value: ParameterValue,
        similarity: f32,
        workflow_name: String,
        parameter_name: String,
        usage_count: u64,
        created_at: Option<i64>,
    ) -> Result<Self, ParameterDomainError> {
        if context.trim().is_empty() {
            return Err(ParameterDomainError::MissingField { field: "context" });
        }
        if workflow_name.trim().is_empty() {
            return Err(ParameterDomainError::MissingField {
                field: "workflow_name",
            });
        }
        if parameter_name.trim().is_empty() {
            return Err(ParameterDomainError::MissingField {
                field: "parameter_name",
            });
        }
        if !(0.0..=1.0).contains(&similarity) {
            return Err(ParameterDomainError::SimilarityOutOfRange { value: similarity });
        }
        if usage_count == 0 {
            return Err(ParameterDomainError::UsageCountOutOfRange { value: usage_count });
        }
        Ok(Self {
            context,
            value,
            similarity,
            workflow_name,
            parameter_name,
            usage_count,
            created_at,
        })
    }
}

/// A parameter the prompt is evidently about but whose value is unknown;
/// produced only inside a `ParameterResolutionResult` so the caller can
/// surface a targeted follow-up question.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnresolvedParameter {
    pub name: String,
    pub schema: ParameterSchema,
    pub context: String,
    pub relevance: f32,
}

impl UnresolvedParameter {
    pub fn new(
        name: String,
        schema: ParameterSchema,
        context: String,
        relevance: f32,
    ) -> Result<Self, ParameterDomainError> {
        if name.trim().is_empty() {
            return Err(ParameterDomainError::MissingField { field: "name" });
        }
        if !(0.0..=1.0).contains(&relevance) {
            return Err(ParameterDomainError::RelevanceOutOfRange { value: relevance });
        }
        Ok(Self {
            name,
            schema,
            context,
            relevance,
        })
    }

    /// The literal shape an interactive client renders as a follow-up
    /// question to the agent.
    pub fn to_question_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "parameter".to_string(),
            Value::String(self.name.clone()),
        );
        payload.insert("context".to_string(), Value::String(self.context.clone()));
        payload.insert(
            "description".to_string(),
            Value::String(self.schema.description.clone()),
        );
        payload.insert(
            "range".to_string(),
            match self.schema.range {
                Some((min, max)) => Value::Array(vec![Value::from(min), Value::from(max)]),
                None => Value::Null,
            },
        );
        payload.insert(
            "enum".to_string(),
            match &self.schema.choices {
                Some(choices) => {
                    Value::Array(choices.iter().map(ParameterValue::to_json).collect())
                }
                None => Value::Null,
            },
        );
        payload.insert(
            "default".to_string(),
            self.schema
                .default
                .as_ref()
                .map(ParameterValue::to_json)
                .unwrap_or(Value::Null),
        );
        payload.insert(
            "type".to_string(),
            Value::String(self.schema.value_type.as_str().to_string()),
        );
        payload.insert(
            "group".to_string(),
            self.schema
                .group
                .as_ref()
                .map(|group| Value::String(group.clone()))
                .unwrap_or(Value::Null),
        );
        payload
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    YamlModifier,
    Learned,
    Default,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::YamlModifier => "yaml_modifier",
            ResolutionSource::Learned => "learned",
            ResolutionSource::Default => "default",
        }
    }
}

/// Aggregate outcome of one resolution pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ParameterResolutionResult {
    pub resolved: BTreeMap<String, ParameterValue>,
    pub unresolved: Vec<UnresolvedParameter>,
    pub resolution_sources: BTreeMap<String, ResolutionSource>,
}

impl ParameterResolutionResult {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn needs_llm_input(&self) -> bool {
        !self.is_complete()
    }
}
