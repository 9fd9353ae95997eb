use paramset::config::ExtractionConfig;
use paramset::resolution::{extract_context, ParameterSchema, ParameterType};

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

#[test]
fn resolution_context_module_short_prompt_is_kept_verbatim() {
    let prompt = "create a picnic table with X-shaped legs";
    let excerpt = extract_context(prompt, &schema_with(&["legs"], ""), &ExtractionConfig::default());
    assert_eq!(excerpt, prompt);
}

#[test]
fn resolution_context_module_prompt_at_the_limit_is_kept_verbatim() {
    let prompt = "a".repeat(500);
    let excerpt = extract_context(&prompt, &schema_with(&["legs"], ""), &ExtractionConfig::default());
    assert_eq!(excerpt, prompt);
}

#[test]
fn resolution_context_module_sentence_tier_keeps_modifier_next_to_hint() {
    let before = "alpha beta gamma delta ".repeat(12) + ".";
    let target = "The table should have X-shaped legs for extra stability.";
    let after = "omega ".repeat(40) + ".";
    let prompt = format!("{before} {target} {after}");
    assert!(prompt.chars().count() > 500);

    let excerpt = extract_context(&prompt, &schema_with(&["legs"], ""), &ExtractionConfig::default());
    assert!(
        excerpt.contains("X-shaped legs"),
        "modifier lost from excerpt: {excerpt}"
    );
    assert!(excerpt.chars().count() <= 400);
    assert!(excerpt.chars().count() < prompt.chars().count());
}

#[test]
fn resolution_context_module_runon_prompt_uses_character_window() {
    let prompt = format!(
        "{}X-shaped legs please {}",
        "pad ".repeat(150),
        "pad ".repeat(150)
    );
    assert!(prompt.chars().count() > 500);

    let excerpt = extract_context(&prompt, &schema_with(&["legs"], ""), &ExtractionConfig::default());
    assert!(
        excerpt.contains("X-shaped legs"),
        "hint split or lost: {excerpt}"
    );
    assert!(excerpt.chars().count() <= 400);
}

#[test]
fn resolution_context_module_hint_matching_is_case_insensitive() {
    let prompt = format!(
        "{}GIVE IT X-SHAPED LEGS NOW {}",
        "pad ".repeat(150),
        "pad ".repeat(150)
    );

    let excerpt = extract_context(&prompt, &schema_with(&["legs"], ""), &ExtractionConfig::default());
    // Original casing survives extraction.
    assert!(excerpt.contains("X-SHAPED LEGS"), "got: {excerpt}");
}

#[test]
fn resolution_context_module_description_keywords_pick_best_sentence() {
    let filler = "alpha beta gamma delta. ".repeat(30);
    let target = "Please give the table a glossy surface finish.";
    let prompt = format!("{filler}{target} alpha beta gamma delta.");
    assert!(prompt.chars().count() > 500);

    let excerpt = extract_context(
        &prompt,
        &schema_with(&["angle"], "surface finish quality"),
        &ExtractionConfig::default(),
    );
    assert!(
        excerpt.contains("glossy surface finish"),
        "keyword sentence not selected: {excerpt}"
    );
    assert!(excerpt.chars().count() <= 400);
}

#[test]
fn resolution_context_module_no_signal_falls_back_to_truncation() {
    let prompt = "pad ".repeat(200);
    assert!(prompt.chars().count() > 500);

    let excerpt = extract_context(&prompt, &schema_with(&[], ""), &ExtractionConfig::default());
    assert!(!excerpt.is_empty());
    assert!(excerpt.chars().count() <= 400);
}

#[test]
fn resolution_context_module_multibyte_text_never_splits_characters() {
    let prompt = format!(
        "{}des pieds en forme de X très inclinés {}",
        "héllo wörld ümlaut ".repeat(30),
        "héllo wörld ümlaut ".repeat(30)
    );
    assert!(prompt.chars().count() > 500);

    let excerpt = extract_context(
        &prompt,
        &schema_with(&["pieds"], ""),
        &ExtractionConfig::default(),
    );
    assert!(excerpt.contains("pieds"), "got: {excerpt}");
    assert!(excerpt.chars().count() <= 400);
}

#[test]
fn resolution_context_module_custom_limits_are_respected() {
    let config = ExtractionConfig {
        full_prompt_max_chars: 10,
        excerpt_max_chars: 60,
        window_radius_chars: 20,
        min_sentence_excerpt_chars: 10,
    };
    let prompt = format!(
        "{}make the legs straight {}",
        "pad ".repeat(30),
        "pad ".repeat(30)
    );

    let excerpt = extract_context(&prompt, &schema_with(&["legs"], ""), &config);
    assert!(excerpt.contains("legs"), "got: {excerpt}");
    assert!(excerpt.chars().count() <= 60);
}
