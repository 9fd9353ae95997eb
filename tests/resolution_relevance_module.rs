use paramset::config::DEFAULT_LITERAL_HINT_BOOST;
use paramset::provider::{EmbeddingError, EmbeddingProvider, HashingEmbedder};
use paramset::resolution::{calculate_relevance, ParameterSchema, ParameterType};

fn schema_with(hints: &[&str], description: &str) -> ParameterSchema {
    ParameterSchema {
        name: "leg_angle".to_string(),
        value_type: ParameterType::Float,
        range: None,
        choices: None,
        default: None,
        description: description.to_string(),
        semantic_hints: hints.iter().map(|h| h.to_string()).collect(),
        group: None,
        computed: None,
        depends_on: Vec::new(),
    }
}

/// Similarity scripted per (text, text) pair; everything else scores zero.
struct ScriptedEmbedder {
    pairs: Vec<(String, String, f32)>,
}

impl ScriptedEmbedder {
    fn new(pairs: &[(&str, &str, f32)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|(a, b, score)| (a.to_string(), b.to_string(), *score))
                .collect(),
        }
    }
}

impl EmbeddingProvider for ScriptedEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![0.0])
    }

    fn similarity(&self, a: &str, b: &str) -> Result<f32, EmbeddingError> {
        Ok(self
            .pairs
            .iter()
            .find(|(x, y, _)| x == a && y == b)
            .map(|(_, _, score)| *score)
            .unwrap_or(0.0))
    }
}

struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("offline".to_string()))
    }

    fn similarity(&self, _a: &str, _b: &str) -> Result<f32, EmbeddingError> {
        Err(EmbeddingError::Unavailable("offline".to_string()))
    }
}

#[test]
fn resolution_relevance_module_literal_hint_floors_the_score() {
    let embedder = HashingEmbedder::new();
    let schema = schema_with(&["angle"], "");

    let score = calculate_relevance(
        &embedder,
        "make the angle steeper",
        &schema,
        DEFAULT_LITERAL_HINT_BOOST,
    )
    .expect("relevance");
    assert!(score >= DEFAULT_LITERAL_HINT_BOOST, "got {score}");
    assert!(score <= 1.0);
}

#[test]
fn resolution_relevance_module_literal_containment_is_case_insensitive() {
    let embedder = HashingEmbedder::new();
    let schema = schema_with(&["angle"], "");

    let score =
        calculate_relevance(&embedder, "SET THE ANGLE", &schema, 0.8).expect("relevance");
    assert!(score >= 0.8, "got {score}");
}

#[test]
fn resolution_relevance_module_boost_never_lowers_a_higher_similarity() {
    let embedder = ScriptedEmbedder::new(&[("the angle please", "angle", 0.95)]);
    let schema = schema_with(&["angle"], "");

    let score =
        calculate_relevance(&embedder, "the angle please", &schema, 0.8).expect("relevance");
    assert!((score - 0.95).abs() < 1e-6, "got {score}");
}

#[test]
fn resolution_relevance_module_takes_the_best_signal_across_hints_and_description() {
    let embedder = ScriptedEmbedder::new(&[
        ("tilt it", "angle of the legs", 0.4),
        ("tilt it", "slope", 0.3),
        ("tilt it", "tilt", 0.7),
    ]);
    let schema = schema_with(&["slope", "tilt"], "angle of the legs");

    let score = calculate_relevance(&embedder, "tilt it", &schema, 0.8).expect("relevance");
    // "tilt" appears verbatim, so the boost wins over every similarity.
    assert!((score - 0.8).abs() < 1e-6, "got {score}");

    let schema = schema_with(&["slope"], "angle of the legs");
    let score = calculate_relevance(&embedder, "tilt it", &schema, 0.8).expect("relevance");
    assert!((score - 0.4).abs() < 1e-6, "got {score}");
}

#[test]
fn resolution_relevance_module_unconfigured_schema_scores_zero() {
    let embedder = HashingEmbedder::new();
    let schema = schema_with(&[], "");
    let score = calculate_relevance(&embedder, "anything", &schema, 0.8).expect("relevance");
    assert_eq!(score, 0.0);

    // Whitespace-only hints are skipped, not matched.
    let schema = schema_with(&["   "], "  ");
    let score = calculate_relevance(&embedder, "anything", &schema, 0.8).expect("relevance");
    assert_eq!(score, 0.0);
}

#[test]
fn resolution_relevance_module_provider_failure_propagates() {
    let schema = schema_with(&["angle"], "");
    let err = calculate_relevance(&FailingEmbedder, "prompt", &schema, 0.8)
        .expect_err("provider failure must surface");
    assert!(matches!(err, EmbeddingError::Unavailable(_)));
}
