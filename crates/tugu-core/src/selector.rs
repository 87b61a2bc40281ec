//! Arg-max selection over the classifier's confidence vector.

use serde::{Deserialize, Serialize};

use crate::labels::LabelTable;

/// Index and value of the largest score. The first maximum wins on ties
/// and NaN never wins. Returns `None` for an empty or all-NaN vector.
pub fn select(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, best_v)) if v <= best_v => best,
            _ => Some((i, v)),
        })
}

/// Outcome of a single classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Winning output index.
    pub index: usize,
    /// Monument name for `index`.
    pub label: String,
    /// Winning score as a percentage. Not clamped, so may slightly exceed 100.
    pub confidence: f32,
}

impl Prediction {
    /// Pick the best class from a confidence vector.
    pub fn from_scores(labels: &LabelTable, scores: &[f32]) -> Option<Self> {
        let (index, score) = select(scores)?;
        Some(Self {
            index,
            label: labels.label(index).to_string(),
            confidence: score * 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_maximum_wins() {
        let mut scores = vec![0.1, 0.9, 0.9];
        scores.resize(12, 0.0);
        assert_eq!(select(&scores), Some((1, 0.9)));
    }

    #[test]
    fn test_select_edge_cases() {
        assert_eq!(select(&[]), None);
        assert_eq!(select(&[f32::NAN, f32::NAN]), None);
        assert_eq!(select(&[f32::NAN, 0.2, 0.1]), Some((1, 0.2)));
        assert_eq!(select(&[-3.0, -1.0, -2.0]), Some((1, -1.0)));
    }

    #[test]
    fn test_end_to_end_scores() {
        let scores = [
            0.01, 0.02, 0.03, 0.02, 0.83, 0.01, 0.01, 0.02, 0.01, 0.02, 0.01, 0.01,
        ];
        let prediction = Prediction::from_scores(&LabelTable::monuments(), &scores).unwrap();

        assert_eq!(prediction.index, 4);
        assert_eq!(prediction.label, "Patung Bung Karno");
        assert!((prediction.confidence - 83.0).abs() < 1e-4);
    }

    #[test]
    fn test_confidence_is_not_clamped() {
        let prediction = Prediction::from_scores(&LabelTable::monuments(), &[1.02, 0.0]).unwrap();
        assert!(prediction.confidence > 100.0);
    }

    #[test]
    fn test_unknown_label_for_extra_outputs() {
        let labels = LabelTable::new(&["only"]);
        let prediction = Prediction::from_scores(&labels, &[0.1, 0.7]).unwrap();
        assert_eq!(prediction.label, "Unknown");
    }
}
