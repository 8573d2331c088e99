//! Metric kinds and score types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every metric the evaluator can produce.
///
/// The first five are judge-backed, the last five are heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Hallucination,
    Relevance,
    Moderation,
    Usefulness,
    Coherence,
    Contains,
    Equals,
    Regex,
    IsJson,
    Levenshtein,
}

/// The pure scoring functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    Contains,
    Equals,
    Regex,
    IsJson,
    Levenshtein,
}

/// What a valid score looks like for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreShape {
    /// Exactly 0 or 1
    Binary,
    /// Any number in [0, 1]
    UnitInterval,
    /// One of a fixed set of labels
    Categorical(&'static [&'static str]),
}

pub const COHERENCE_LABELS: &[&str] = &["incoherent", "partially_coherent", "coherent"];

impl MetricKind {
    pub const ALL: [MetricKind; 10] = [
        MetricKind::Hallucination,
        MetricKind::Relevance,
        MetricKind::Moderation,
        MetricKind::Usefulness,
        MetricKind::Coherence,
        MetricKind::Contains,
        MetricKind::Equals,
        MetricKind::Regex,
        MetricKind::IsJson,
        MetricKind::Levenshtein,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Hallucination => "hallucination",
            MetricKind::Relevance => "relevance",
            MetricKind::Moderation => "moderation",
            MetricKind::Usefulness => "usefulness",
            MetricKind::Coherence => "coherence",
            MetricKind::Contains => "contains",
            MetricKind::Equals => "equals",
            MetricKind::Regex => "regex",
            MetricKind::IsJson => "is_json",
            MetricKind::Levenshtein => "levenshtein",
        }
    }

    /// The heuristic that handles this kind, or `None` for judge-backed kinds.
    pub fn heuristic_kind(&self) -> Option<HeuristicKind> {
        match self {
            MetricKind::Contains => Some(HeuristicKind::Contains),
            MetricKind::Equals => Some(HeuristicKind::Equals),
            MetricKind::Regex => Some(HeuristicKind::Regex),
            MetricKind::IsJson => Some(HeuristicKind::IsJson),
            MetricKind::Levenshtein => Some(HeuristicKind::Levenshtein),
            _ => None,
        }
    }

    pub fn is_judge_backed(&self) -> bool {
        self.heuristic_kind().is_none()
    }

    pub fn score_shape(&self) -> ScoreShape {
        match self {
            MetricKind::Hallucination
            | MetricKind::Contains
            | MetricKind::Equals
            | MetricKind::Regex
            | MetricKind::IsJson => ScoreShape::Binary,
            MetricKind::Relevance
            | MetricKind::Moderation
            | MetricKind::Usefulness
            | MetricKind::Levenshtein => ScoreShape::UnitInterval,
            MetricKind::Coherence => ScoreShape::Categorical(COHERENCE_LABELS),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown metric type '{s}'"))
    }
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 5] = [
        HeuristicKind::Contains,
        HeuristicKind::Equals,
        HeuristicKind::Regex,
        HeuristicKind::IsJson,
        HeuristicKind::Levenshtein,
    ];

    pub fn as_str(&self) -> &'static str {
        self.metric_kind().as_str()
    }

    pub fn metric_kind(&self) -> MetricKind {
        match self {
            HeuristicKind::Contains => MetricKind::Contains,
            HeuristicKind::Equals => MetricKind::Equals,
            HeuristicKind::Regex => MetricKind::Regex,
            HeuristicKind::IsJson => MetricKind::IsJson,
            HeuristicKind::Levenshtein => MetricKind::Levenshtein,
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeuristicKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HeuristicKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown heuristic type '{s}'"))
    }
}

/// A metric score: numeric for most kinds, a label for categorical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Numeric(f64),
    Label(String),
}

impl Score {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Score::Numeric(value) => Some(*value),
            Score::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Score::Label(label) => Some(label),
            Score::Numeric(_) => None,
        }
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Score::Numeric(value)
    }
}

impl From<bool> for Score {
    fn from(value: bool) -> Self {
        Score::Numeric(if value { 1.0 } else { 0.0 })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Numeric(value) => write!(f, "{value}"),
            Score::Label(label) => f.write_str(label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_in_one_group() {
        let judge: Vec<_> = MetricKind::ALL.iter().filter(|k| k.is_judge_backed()).collect();
        let heuristic: Vec<_> =
            MetricKind::ALL.iter().filter(|k| k.heuristic_kind().is_some()).collect();
        assert_eq!(judge.len(), 5);
        assert_eq!(heuristic.len(), 5);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&MetricKind::IsJson).unwrap(), "\"is_json\"");
        let kind: MetricKind = serde_json::from_str("\"hallucination\"").unwrap();
        assert_eq!(kind, MetricKind::Hallucination);
        assert_eq!("levenshtein".parse::<MetricKind>().unwrap(), MetricKind::Levenshtein);
        assert!("toxicity".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_heuristic_round_trip() {
        for kind in HeuristicKind::ALL {
            assert_eq!(kind.metric_kind().heuristic_kind(), Some(kind));
            assert_eq!(kind.as_str().parse::<HeuristicKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_score_serializes_untagged() {
        assert_eq!(serde_json::to_value(Score::Numeric(0.9)).unwrap(), serde_json::json!(0.9));
        assert_eq!(
            serde_json::to_value(Score::Label("coherent".into())).unwrap(),
            serde_json::json!("coherent")
        );
        let score: Score = serde_json::from_value(serde_json::json!(1)).unwrap();
        assert_eq!(score.as_f64(), Some(1.0));
    }

    #[test]
    fn test_shapes() {
        assert_eq!(MetricKind::Hallucination.score_shape(), ScoreShape::Binary);
        assert_eq!(MetricKind::Moderation.score_shape(), ScoreShape::UnitInterval);
        assert!(matches!(MetricKind::Coherence.score_shape(), ScoreShape::Categorical(_)));
    }
}
