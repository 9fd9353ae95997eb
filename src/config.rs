use serde::{Deserialize, Serialize};

/// Minimum retrieval score for reusing a learned mapping (Tier 2). Stricter
/// than the relevance gate: a wrong reused value is worse than a question.
pub const DEFAULT_REUSE_THRESHOLD: f32 = 0.85;

/// Minimum relevance for asking about a parameter instead of defaulting it
/// (Tier 3). A prompt may clearly be about a parameter without yet having a
/// known value for it, so this sits well below the reuse threshold.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.5;

/// Relevance floor applied when a hint appears verbatim in the prompt;
/// literal containment is stronger evidence than embedding similarity and
/// may only ever raise the score.
pub const DEFAULT_LITERAL_HINT_BOOST: f32 = 0.8;

/// Prompts at or under this length are used as context verbatim.
pub const DEFAULT_FULL_PROMPT_MAX_CHARS: usize = 500;

/// Hard cap on any extracted excerpt.
pub const DEFAULT_EXCERPT_MAX_CHARS: usize = 400;

/// Half-width of the fallback character window around a matched hint.
pub const DEFAULT_WINDOW_RADIUS_CHARS: usize = 200;

/// A sentence-tier excerpt shorter than this is judged too thin to carry
/// enough signal and the window tier is tried instead.
pub const DEFAULT_MIN_SENTENCE_EXCERPT_CHARS: usize = 100;

fn default_reuse_threshold() -> f32 {
    DEFAULT_REUSE_THRESHOLD
}

fn default_relevance_threshold() -> f32 {
    DEFAULT_RELEVANCE_THRESHOLD
}

fn default_literal_hint_boost() -> f32 {
    DEFAULT_LITERAL_HINT_BOOST
}

fn default_full_prompt_max_chars() -> usize {
    DEFAULT_FULL_PROMPT_MAX_CHARS
}

fn default_excerpt_max_chars() -> usize {
    DEFAULT_EXCERPT_MAX_CHARS
}

fn default_window_radius_chars() -> usize {
    DEFAULT_WINDOW_RADIUS_CHARS
}

fn default_min_sentence_excerpt_chars() -> usize {
    DEFAULT_MIN_SENTENCE_EXCERPT_CHARS
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionConfig {
    #[serde(default = "default_reuse_threshold")]
    pub reuse_threshold: f32,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
    #[serde(default = "default_literal_hint_boost")]
    pub literal_hint_boost: f32,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            reuse_threshold: default_reuse_threshold(),
            relevance_threshold: default_relevance_threshold(),
            literal_hint_boost: default_literal_hint_boost(),
            extraction: ExtractionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    #[serde(default = "default_full_prompt_max_chars")]
    pub full_prompt_max_chars: usize,
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    #[serde(default = "default_window_radius_chars")]
    pub window_radius_chars: usize,
    #[serde(default = "default_min_sentence_excerpt_chars")]
    pub min_sentence_excerpt_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            full_prompt_max_chars: default_full_prompt_max_chars(),
            excerpt_max_chars: default_excerpt_max_chars(),
            window_radius_chars: default_window_radius_chars(),
            min_sentence_excerpt_chars: default_min_sentence_excerpt_chars(),
        }
    }
}

impl ResolutionConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("resolution.reuse_threshold", self.reuse_threshold),
            ("resolution.relevance_threshold", self.relevance_threshold),
            ("resolution.literal_hint_boost", self.literal_hint_boost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{field} must be within 0.0..=1.0"));
            }
        }
        self.extraction.validate()
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, String> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|err| format!("invalid resolution config: {err}"))?;
        config.validate()?;
        Ok(config)
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.excerpt_max_chars == 0 {
            return Err("extraction.excerpt_max_chars must be >= 1".to_string());
        }
        if self.window_radius_chars == 0 {
            return Err("extraction.window_radius_chars must be >= 1".to_string());
        }
        if self.min_sentence_excerpt_chars > self.excerpt_max_chars {
            return Err(
                "extraction.min_sentence_excerpt_chars must not exceed excerpt_max_chars"
                    .to_string(),
            );
        }
        Ok(())
    }
}
