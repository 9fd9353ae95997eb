use super::domain::{FeedbackEntry, MatchType};
use crate::shared::fs_atomic::atomic_write_file;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_MIN_CORRECTIONS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("failed to read feedback log {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse feedback log {path} line {line}: {source}")]
    Parse {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode feedback entry for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write feedback log {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FeedbackStatistics {
    pub total_entries: usize,
    pub matched: usize,
    pub failed: usize,
    pub corrections: usize,
    pub helpful_yes: usize,
    pub helpful_no: usize,
    pub average_confidence: f32,
    pub by_match_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct WorkflowFeedbackStatistics {
    pub workflow_name: String,
    pub matches: usize,
    pub corrections_to: usize,
    pub corrections_from: usize,
    pub average_confidence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingLabel {
    ConfirmedMatch,
    Correction,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrainingExample {
    pub prompt: String,
    pub workflow_name: String,
    pub label: TrainingLabel,
}

/// Best-effort, persisted audit trail of match outcomes and corrections.
/// Independent of the resolver; never gates resolution. Persistence is a
/// JSONL file rewritten atomically on save — a single writer per storage
/// path is assumed, multi-writer coordination is the storage's problem.
#[derive(Debug)]
pub struct FeedbackCollector {
    entries: Vec<FeedbackEntry>,
    storage_path: PathBuf,
    max_entries: usize,
    auto_save: bool,
}

impl FeedbackCollector {
    pub fn open(storage_path: &Path) -> Result<Self, FeedbackError> {
        Self::with_limits(storage_path, DEFAULT_MAX_ENTRIES, true)
    }

    pub fn with_limits(
        storage_path: &Path,
        max_entries: usize,
        auto_save: bool,
    ) -> Result<Self, FeedbackError> {
        let entries = load_entries(storage_path)?;
        Ok(Self {
            entries,
            storage_path: storage_path.to_path_buf(),
            max_entries: max_entries.max(1),
            auto_save,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn record_match(
        &mut self,
        prompt: &str,
        matched_workflow: Option<&str>,
        confidence: f32,
        match_type: MatchType,
        metadata: Map<String, Value>,
    ) -> Result<(), FeedbackError> {
        self.entries.push(FeedbackEntry {
            timestamp: Utc::now().timestamp(),
            prompt: prompt.to_string(),
            matched_workflow: matched_workflow.map(str::to_string),
            match_confidence: confidence,
            match_type,
            user_correction: None,
            was_helpful: None,
            metadata,
        });
        self.maybe_save()
    }

    /// Amends the most recent entry for `(prompt, original_match)` in place;
    /// when no such entry exists, appends a standalone correction entry.
    pub fn record_correction(
        &mut self,
        prompt: &str,
        original_match: &str,
        correct_workflow: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), FeedbackError> {
        if let Some(entry) = self.find_latest_mut(prompt, original_match) {
            entry.user_correction = Some(correct_workflow.to_string());
            entry.was_helpful = Some(false);
            for (key, value) in metadata {
                entry.metadata.insert(key, value);
            }
            return self.maybe_save();
        }

        self.entries.push(FeedbackEntry {
            timestamp: Utc::now().timestamp(),
            prompt: prompt.to_string(),
            matched_workflow: Some(original_match.to_string()),
            match_confidence: 0.0,
            match_type: MatchType::Correction,
            user_correction: Some(correct_workflow.to_string()),
            was_helpful: Some(false),
            metadata,
        });
        self.maybe_save()
    }

    /// Marks the most recent entry for `(prompt, matched_workflow)`;
    /// returns whether a matching entry was found.
    pub fn record_helpful(
        &mut self,
        prompt: &str,
        matched_workflow: &str,
        was_helpful: bool,
    ) -> Result<bool, FeedbackError> {
        let found = match self.find_latest_mut(prompt, matched_workflow) {
            Some(entry) => {
                entry.was_helpful = Some(was_helpful);
                true
            }
            None => false,
        };
        if found {
            self.maybe_save()?;
        }
        Ok(found)
    }

    /// Distinct prompts corrected *to* `workflow_name` at least
    /// `min_corrections` times; candidates for strengthening future intent
    /// matching.
    pub fn get_new_sample_prompts(
        &self,
        workflow_name: &str,
        min_corrections: usize,
    ) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &self.entries {
            if entry.user_correction.as_deref() == Some(workflow_name) {
                *counts.entry(entry.prompt.as_str()).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count >= min_corrections.max(1))
            .map(|(prompt, _)| prompt.to_string())
            .collect()
    }

    pub fn get_failed_matches(&self) -> Vec<&FeedbackEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.match_type == MatchType::None)
            .collect()
    }

    pub fn get_low_confidence_matches(&self, threshold: f32) -> Vec<&FeedbackEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.matched_workflow.is_some() && entry.match_confidence < threshold
            })
            .collect()
    }

    /// Entries corrected *to* the workflow.
    pub fn get_corrections_for_workflow(&self, workflow_name: &str) -> Vec<&FeedbackEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.user_correction.as_deref() == Some(workflow_name))
            .collect()
    }

    /// Entries corrected *away from* the workflow.
    pub fn get_corrections_from_workflow(&self, workflow_name: &str) -> Vec<&FeedbackEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.matched_workflow.as_deref() == Some(workflow_name)
                    && entry.user_correction.is_some()
            })
            .collect()
    }

    pub fn get_statistics(&self) -> FeedbackStatistics {
        let mut stats = FeedbackStatistics {
            total_entries: self.entries.len(),
            ..FeedbackStatistics::default()
        };
        let mut confidence_sum = 0.0_f32;
        for entry in &self.entries {
            if entry.matched_workflow.is_some() {
                stats.matched += 1;
            }
            if entry.match_type == MatchType::None {
                stats.failed += 1;
            }
            if entry.user_correction.is_some() {
                stats.corrections += 1;
            }
            match entry.was_helpful {
                Some(true) => stats.helpful_yes += 1,
                Some(false) => stats.helpful_no += 1,
                None => {}
            }
            confidence_sum += entry.match_confidence;
            *stats
                .by_match_type
                .entry(match_type_label(entry.match_type).to_string())
                .or_insert(0) += 1;
        }
        if !self.entries.is_empty() {
            stats.average_confidence = confidence_sum / self.entries.len() as f32;
        }
        stats
    }

    pub fn get_workflow_statistics(&self, workflow_name: &str) -> WorkflowFeedbackStatistics {
        let mut stats = WorkflowFeedbackStatistics {
            workflow_name: workflow_name.to_string(),
            ..WorkflowFeedbackStatistics::default()
        };
        let mut confidence_sum = 0.0_f32;
        let mut confidence_count = 0usize;
        for entry in &self.entries {
            if entry.matched_workflow.as_deref() == Some(workflow_name) {
                stats.matches += 1;
                confidence_sum += entry.match_confidence;
                confidence_count += 1;
                if entry.user_correction.is_some() {
                    stats.corrections_from += 1;
                }
            }
            if entry.user_correction.as_deref() == Some(workflow_name) {
                stats.corrections_to += 1;
            }
        }
        if confidence_count > 0 {
            stats.average_confidence = confidence_sum / confidence_count as f32;
        }
        stats
    }

    /// Confirmed matches and corrections as (prompt, workflow) training
    /// pairs, in log order.
    pub fn export_for_training(&self) -> Vec<TrainingExample> {
        let mut out = Vec::new();
        for entry in &self.entries {
            if let Some(corrected) = &entry.user_correction {
                out.push(TrainingExample {
                    prompt: entry.prompt.clone(),
                    workflow_name: corrected.clone(),
                    label: TrainingLabel::Correction,
                });
            } else if entry.was_helpful == Some(true) {
                if let Some(workflow) = &entry.matched_workflow {
                    out.push(TrainingExample {
                        prompt: entry.prompt.clone(),
                        workflow_name: workflow.clone(),
                        label: TrainingLabel::ConfirmedMatch,
                    });
                }
            }
        }
        out
    }

    /// Drops oldest entries beyond `max_entries`, then rewrites the log
    /// atomically.
    pub fn save(&mut self) -> Result<(), FeedbackError> {
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }

        let mut out = String::new();
        for entry in &self.entries {
            let line =
                serde_json::to_string(entry).map_err(|source| FeedbackError::Encode {
                    path: self.storage_path.display().to_string(),
                    source,
                })?;
            out.push_str(&line);
            out.push('\n');
        }

        atomic_write_file(&self.storage_path, out.as_bytes()).map_err(|source| {
            FeedbackError::Write {
                path: self.storage_path.display().to_string(),
                source,
            }
        })
    }

    fn maybe_save(&mut self) -> Result<(), FeedbackError> {
        if self.auto_save {
            self.save()?;
        }
        Ok(())
    }

    fn find_latest_mut(
        &mut self,
        prompt: &str,
        matched_workflow: &str,
    ) -> Option<&mut FeedbackEntry> {
        self.entries.iter_mut().rev().find(|entry| {
            entry.prompt == prompt && entry.matched_workflow.as_deref() == Some(matched_workflow)
        })
    }
}

fn match_type_label(match_type: MatchType) -> &'static str {
    match match_type {
        MatchType::Exact => "exact",
        MatchType::Semantic => "semantic",
        MatchType::Generalized => "generalized",
        MatchType::None => "none",
        MatchType::Correction => "correction",
    }
}

fn load_entries(path: &Path) -> Result<Vec<FeedbackEntry>, FeedbackError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).map_err(|source| FeedbackError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let mut entries = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry =
            serde_json::from_str::<FeedbackEntry>(line).map_err(|source| FeedbackError::Parse {
                path: path.display().to_string(),
                line: index + 1,
                source,
            })?;
        entries.push(entry);
    }
    Ok(entries)
}
