//! Deterministic heuristic scorers.
//!
//! The free functions are the scoring primitives. [`HeuristicRegistry`] maps a
//! [`HeuristicKind`] to a [`Heuristic`] implementation that resolves the
//! expected value from config or request reference and calls the primitive.

use crate::config::HeuristicConfig;
use crate::error::{EvalError, Result};
use crate::metric::HeuristicKind;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::Arc;

/// Substring test.
pub fn contains(output: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        output.contains(needle)
    } else {
        output.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Exact equality.
pub fn equals(output: &str, expected: &str, case_sensitive: bool) -> bool {
    if case_sensitive { output == expected } else { output.to_lowercase() == expected.to_lowercase() }
}

/// Compile `pattern` with single-letter `flags` (`i`, `m`, `s`, `x`).
pub fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(EvalError::InvalidConfig(format!("unsupported regex flag '{other}'")));
            }
        };
    }
    builder.build().map_err(|e| EvalError::InvalidPattern(e.to_string()))
}

/// Whether `pattern` matches anywhere in `output`.
pub fn regex(output: &str, pattern: &str, flags: &str) -> Result<bool> {
    Ok(compile_pattern(pattern, flags)?.is_match(output))
}

/// Whether `output` is well-formed JSON.
pub fn is_json(output: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(output).is_ok()
}

/// Character-level edit distance.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Longest text, in chars, the `levenshtein` heuristic accepts on either side.
///
/// Edit distance is quadratic and runs on the request's worker thread.
pub const MAX_LEVENSHTEIN_CHARS: usize = 5_000;

fn check_levenshtein_len(field: &str, text: &str) -> Result<()> {
    // byte length bounds char count from above
    if text.len() > MAX_LEVENSHTEIN_CHARS && text.chars().count() > MAX_LEVENSHTEIN_CHARS {
        return Err(EvalError::validation(
            field,
            format!("must be at most {MAX_LEVENSHTEIN_CHARS} characters for levenshtein"),
        ));
    }
    Ok(())
}

/// Normalized similarity: `1 - distance / max(len)`, in [0, 1]. Two empty strings score 1.
pub fn levenshtein(output: &str, reference: &str) -> f64 {
    let max_len = output.chars().count().max(reference.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = edit_distance(output, reference);
    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}

fn bool_score(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

fn expected_value<'a>(
    kind: HeuristicKind,
    configured: Option<&'a str>,
    reference: Option<&'a str>,
) -> Result<&'a str> {
    configured.or(reference).ok_or_else(|| {
        EvalError::InvalidConfig(format!(
            "{kind} needs an expected value: set it in the config or pass a reference"
        ))
    })
}

fn mismatch(expected: HeuristicKind, config: &HeuristicConfig) -> EvalError {
    EvalError::InvalidConfig(format!("{} config given to {expected} heuristic", config.kind()))
}

/// A scoring function for one heuristic kind.
pub trait Heuristic: Send + Sync {
    fn kind(&self) -> HeuristicKind;

    /// Score `output`. `reference` is the request's reference text, used when the
    /// config carries no expected value.
    fn score(&self, output: &str, reference: Option<&str>, config: &HeuristicConfig)
    -> Result<f64>;
}

pub struct ContainsHeuristic;

impl Heuristic for ContainsHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Contains
    }

    fn score(&self, output: &str, reference: Option<&str>, config: &HeuristicConfig) -> Result<f64> {
        let HeuristicConfig::Contains(config) = config else {
            return Err(mismatch(self.kind(), config));
        };
        let needle = expected_value(self.kind(), config.value.as_deref(), reference)?;
        Ok(bool_score(contains(output, needle, config.case_sensitive)))
    }
}

pub struct EqualsHeuristic;

impl Heuristic for EqualsHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Equals
    }

    fn score(&self, output: &str, reference: Option<&str>, config: &HeuristicConfig) -> Result<f64> {
        let HeuristicConfig::Equals(config) = config else {
            return Err(mismatch(self.kind(), config));
        };
        let expected = expected_value(self.kind(), config.value.as_deref(), reference)?;
        Ok(bool_score(equals(output, expected, config.case_sensitive)))
    }
}

pub struct RegexHeuristic;

impl Heuristic for RegexHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Regex
    }

    fn score(&self, output: &str, _reference: Option<&str>, config: &HeuristicConfig) -> Result<f64> {
        let HeuristicConfig::Regex(config) = config else {
            return Err(mismatch(self.kind(), config));
        };
        Ok(bool_score(regex(output, &config.pattern, &config.flags)?))
    }
}

pub struct IsJsonHeuristic;

impl Heuristic for IsJsonHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::IsJson
    }

    fn score(&self, output: &str, _reference: Option<&str>, config: &HeuristicConfig) -> Result<f64> {
        if !matches!(config, HeuristicConfig::IsJson(_)) {
            return Err(mismatch(self.kind(), config));
        }
        Ok(bool_score(is_json(output)))
    }
}

pub struct LevenshteinHeuristic;

impl Heuristic for LevenshteinHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Levenshtein
    }

    fn score(&self, output: &str, reference: Option<&str>, config: &HeuristicConfig) -> Result<f64> {
        let HeuristicConfig::Levenshtein(config) = config else {
            return Err(mismatch(self.kind(), config));
        };
        let expected = expected_value(self.kind(), config.reference.as_deref(), reference)?;
        check_levenshtein_len("output", output)?;
        check_levenshtein_len("reference", expected)?;
        Ok(levenshtein(output, expected))
    }
}

/// Maps each heuristic kind to its implementation.
#[derive(Clone)]
pub struct HeuristicRegistry {
    heuristics: HashMap<HeuristicKind, Arc<dyn Heuristic>>,
}

impl HeuristicRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self { heuristics: HashMap::new() }
    }

    /// A registry with the five built-in heuristics.
    pub fn with_defaults() -> Self {
        Self::empty()
            .register(Arc::new(ContainsHeuristic))
            .register(Arc::new(EqualsHeuristic))
            .register(Arc::new(RegexHeuristic))
            .register(Arc::new(IsJsonHeuristic))
            .register(Arc::new(LevenshteinHeuristic))
    }

    /// Add or replace the implementation for `heuristic.kind()`.
    pub fn register(mut self, heuristic: Arc<dyn Heuristic>) -> Self {
        self.heuristics.insert(heuristic.kind(), heuristic);
        self
    }

    pub fn get(&self, kind: HeuristicKind) -> Option<&Arc<dyn Heuristic>> {
        self.heuristics.get(&kind)
    }

    pub fn kinds(&self) -> Vec<HeuristicKind> {
        let mut kinds: Vec<_> = self.heuristics.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub fn score(
        &self,
        output: &str,
        reference: Option<&str>,
        config: &HeuristicConfig,
    ) -> Result<f64> {
        let kind = config.kind();
        let heuristic = self
            .get(kind)
            .ok_or_else(|| EvalError::UnsupportedMetric(format!("no heuristic registered for {kind}")))?;
        heuristic.score(output, reference, config)
    }
}

impl Default for HeuristicRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
