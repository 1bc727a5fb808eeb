use serde::Serialize;

use crate::error::{PredictorError, Result};
use crate::models::{ScoreOdd, TopPrediction};
use crate::utils::{clamp_confidence, round1};

/// Minimum number of usable odds entries before a prediction may be generated
pub const MIN_VALID_ODDS: usize = 3;
const TOP_PREDICTIONS: usize = 5;

/// Depth multiplier table.
///
/// `Baseline` is what the odds analyzer uses on its own; `Enhanced` is the
/// stronger table paired with the genetic + Poisson predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierTiers {
    #[default]
    Baseline,
    Enhanced,
}

impl MultiplierTiers {
    /// Multiplier for `depth` valid entries; exactly one tier applies
    pub fn depth_multiplier(self, depth: usize) -> f64 {
        let (deep, standard, shallow) = match self {
            MultiplierTiers::Baseline => (1.3, 1.2, 1.1),
            MultiplierTiers::Enhanced => (1.4, 1.3, 1.2),
        };
        match depth {
            d if d >= 15 => deep,
            d if d >= 10 => standard,
            d if d >= 5 => shallow,
            _ => 1.0,
        }
    }

    /// (ratio to average coefficient, bonus multiplier) for a "safer than average" top pick
    fn clustering_rule(self) -> (f64, f64) {
        match self {
            MultiplierTiers::Baseline => (0.8, 1.15),
            MultiplierTiers::Enhanced => (0.75, 1.2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    pub depth: usize,
    pub avg_coefficient: f64,
    pub confidence_multiplier: f64,
    pub clustering_bonus: bool,
    pub tiers: MultiplierTiers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsAnalysis {
    pub predicted_score: String,
    pub confidence: u8,
    pub top_predictions: Vec<TopPrediction>,
    pub metadata: AnalysisMetadata,
}

/// A usable odds entry with its derived probability.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedOdd {
    pub score: String,
    pub coefficient: f64,
    pub probability: f64,
}

/// Keep entries with a non-empty score and a positive numeric coefficient, in input order.
pub fn valid_odds(odds: &[ScoreOdd]) -> Vec<RankedOdd> {
    odds.iter()
        .filter_map(|odd| {
            if !odd.is_valid() {
                return None;
            }
            Some(RankedOdd {
                score: odd.score.trim().to_string(),
                coefficient: odd.coefficient.value()?,
                probability: odd.probability()?,
            })
        })
        .collect()
}

/// Reject inputs with too few usable odds entries
pub fn ensure_enough_odds(odds: &[ScoreOdd]) -> Result<usize> {
    let count = odds.iter().filter(|odd| odd.is_valid()).count();
    if count < MIN_VALID_ODDS {
        return Err(PredictorError::Validation(format!(
            "at least {} scores with valid coefficients are required, got {}",
            MIN_VALID_ODDS, count
        )));
    }
    Ok(count)
}

/// Deterministic odds-to-prediction transform.
#[derive(Debug, Clone, Default)]
pub struct OddsAnalyzer {
    tiers: MultiplierTiers,
}

impl OddsAnalyzer {
    pub fn new(tiers: MultiplierTiers) -> Self {
        Self { tiers }
    }

    /// Rank the odds and derive the predicted score and its confidence.
    ///
    /// Never fails: an input without any usable entry yields "0-0" at 0%.
    pub fn analyze(&self, odds: &[ScoreOdd]) -> OddsAnalysis {
        let mut ranked = valid_odds(odds);
        let depth = ranked.len();

        if ranked.is_empty() {
            return OddsAnalysis {
                predicted_score: "0-0".to_string(),
                confidence: 0,
                top_predictions: Vec::new(),
                metadata: AnalysisMetadata {
                    depth: 0,
                    avg_coefficient: 0.0,
                    confidence_multiplier: 1.0,
                    clustering_bonus: false,
                    tiers: self.tiers,
                },
            };
        }

        // sort_by is stable: equal probabilities keep input order
        ranked.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let top = &ranked[0];
        let avg_coefficient = ranked.iter().map(|o| o.coefficient).sum::<f64>() / depth as f64;

        let mut multiplier = self.tiers.depth_multiplier(depth);
        let (ratio, bonus) = self.tiers.clustering_rule();
        let clustering_bonus = top.coefficient < avg_coefficient * ratio;
        if clustering_bonus {
            multiplier *= bonus;
        }

        let confidence = clamp_confidence(top.probability * multiplier);

        let top_predictions = ranked
            .iter()
            .take(TOP_PREDICTIONS)
            .map(|o| TopPrediction {
                score: o.score.clone(),
                probability: round1(o.probability),
            })
            .collect();

        OddsAnalysis {
            predicted_score: top.score.clone(),
            confidence,
            top_predictions,
            metadata: AnalysisMetadata {
                depth,
                avg_coefficient: (avg_coefficient * 100.0).round() / 100.0,
                confidence_multiplier: multiplier,
                clustering_bonus,
                tiers: self.tiers,
            },
        }
    }
}
