use chrono::Utc;
use serde::Serialize;

use crate::config::Settings;
use crate::error::{PredictorError, Result};
use crate::models::{HeadToHeadMatch, MatchInput, Prediction, PredictionSource, ScoreOdd, TopPrediction};
use crate::services::enhanced::EnhancedPredictor;
use crate::services::genetic::GeneticConfig;
use crate::services::head_to_head::{summarize, HeadToHeadSummary};
use crate::services::odds_analyzer::{ensure_enough_odds, MultiplierTiers, OddsAnalyzer};
use crate::utils::validate_team_name;

const BASELINE_METHODOLOGY: &str = "Bookmaker odds analysis";
const TOP_PREDICTIONS: usize = 5;

/// A freshly generated prediction plus how it was produced
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPrediction {
    pub prediction: Prediction,
    pub alternative_scores: Vec<String>,
    pub head_to_head: Option<HeadToHeadSummary>,
    pub head_to_head_applied: bool,
}

pub struct PredictionEngine {
    analyzer: OddsAnalyzer,
    enhanced: Option<EnhancedPredictor>,
}

impl PredictionEngine {
    pub fn new(analyzer: OddsAnalyzer, enhanced: Option<EnhancedPredictor>) -> Self {
        Self { analyzer, enhanced }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let enhanced = settings.enrichment_enabled.then(|| {
            let config = GeneticConfig {
                population_size: settings.population_size,
                generations: settings.generations,
                ..GeneticConfig::default()
            };
            EnhancedPredictor::new(
                config,
                settings.enrichment_failure_rate,
                settings.simulated_latency,
                settings.seed,
            )
        });
        Self::new(OddsAnalyzer::new(MultiplierTiers::Baseline), enhanced)
    }

    /// Baseline-only engine, no randomness involved
    pub fn baseline() -> Self {
        Self::new(OddsAnalyzer::default(), None)
    }

    /// Generate a prediction for one match.
    ///
    /// Tries the enhanced predictor first and falls back to the odds analyzer
    /// when it is unavailable. A meaningful head-to-head record between the
    /// two teams adds a fixed confidence bonus.
    pub async fn generate_prediction(
        &self,
        input: &MatchInput,
        head_to_head: &[HeadToHeadMatch],
    ) -> Result<GeneratedPrediction> {
        validate_input(input)?;
        let odds: Vec<ScoreOdd> = input.score_odds.iter().filter(|o| o.is_valid()).cloned().collect();

        let (mut predicted, mut alternatives) = match &self.enhanced {
            Some(enhanced) => match enhanced.predict(&input.home_team, &input.away_team, &odds).await {
                Ok(result) => {
                    // Ranked scores always come from the quoted odds, never from the grid
                    let top_predictions = OddsAnalyzer::new(MultiplierTiers::Enhanced)
                        .analyze(&odds)
                        .top_predictions;
                    let mut alternatives = result.alternative_scores;
                    alternatives.extend(
                        result
                            .mathematical_probabilities
                            .iter()
                            .take(TOP_PREDICTIONS)
                            .map(|cell| cell.score.clone()),
                    );
                    (
                        Scored {
                            score: result.recommended_score,
                            confidence: result.confidence,
                            top_predictions,
                            source: PredictionSource::Enhanced,
                            methodology: result.methodology.to_string(),
                        },
                        alternatives,
                    )
                }
                Err(PredictorError::EnrichmentUnavailable(reason)) => {
                    tracing::warn!(
                        "Enhanced predictor unavailable for {} vs {} ({}), using odds analysis",
                        input.home_team,
                        input.away_team,
                        reason
                    );
                    (self.baseline_scored(&odds, PredictionSource::BaselineFallback), Vec::new())
                }
                Err(e) => return Err(e),
            },
            None => (self.baseline_scored(&odds, PredictionSource::Baseline), Vec::new()),
        };

        let summary = summarize(&input.home_team, &input.away_team, head_to_head);
        let head_to_head_applied = summary.is_meaningful();
        if head_to_head_applied {
            let adjusted = summary.adjust_confidence(predicted.confidence);
            tracing::info!(
                "Head-to-head record ({} matches) adjusts confidence {}% -> {}%",
                summary.total_matches,
                predicted.confidence,
                adjusted
            );
            predicted.confidence = adjusted;
        }

        // Alternatives never repeat the headline score or each other
        for top in &predicted.top_predictions {
            alternatives.push(top.score.clone());
        }
        let mut seen = Vec::with_capacity(alternatives.len());
        alternatives.retain(|s| {
            if *s == predicted.score || seen.contains(s) {
                return false;
            }
            seen.push(s.clone());
            true
        });

        let prediction = Prediction {
            id: 0,
            home_team: input.home_team.trim().to_string(),
            away_team: input.away_team.trim().to_string(),
            match_date_time: input.date_time.trim().to_string(),
            score_odds: odds,
            predicted_score: predicted.score,
            confidence: predicted.confidence,
            top_predictions: predicted.top_predictions,
            source: predicted.source,
            methodology: predicted.methodology,
            timestamp: Utc::now(),
            actual_result: None,
        };

        tracing::info!(
            "Generated prediction for {} vs {}: {} at {}% ({:?})",
            prediction.home_team,
            prediction.away_team,
            prediction.predicted_score,
            prediction.confidence,
            prediction.source
        );

        Ok(GeneratedPrediction {
            prediction,
            alternative_scores: alternatives,
            head_to_head: (summary.total_matches > 0).then_some(summary),
            head_to_head_applied,
        })
    }

    fn baseline_scored(&self, odds: &[ScoreOdd], source: PredictionSource) -> Scored {
        let analysis = self.analyzer.analyze(odds);
        Scored {
            score: analysis.predicted_score,
            confidence: analysis.confidence,
            top_predictions: analysis.top_predictions,
            source,
            methodology: BASELINE_METHODOLOGY.to_string(),
        }
    }
}

struct Scored {
    score: String,
    confidence: u8,
    top_predictions: Vec<TopPrediction>,
    source: PredictionSource,
    methodology: String,
}

/// Required fields present and at least three usable odds entries
pub fn validate_input(input: &MatchInput) -> Result<()> {
    if !validate_team_name(&input.home_team) {
        return Err(PredictorError::Validation("home team is required".to_string()));
    }
    if !validate_team_name(&input.away_team) {
        return Err(PredictorError::Validation("away team is required".to_string()));
    }
    if input.date_time.trim().is_empty() {
        return Err(PredictorError::Validation("match date and time are required".to_string()));
    }
    ensure_enough_odds(&input.score_odds)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coefficient;
    use std::time::Duration;

    fn input(odds: Vec<ScoreOdd>) -> MatchInput {
        MatchInput {
            home_team: "Chelsea".to_string(),
            away_team: "Arsenal".to_string(),
            date_time: "2024-01-15 15:00".to_string(),
            score_odds: odds,
        }
    }

    fn reference_odds() -> Vec<ScoreOdd> {
        vec![ScoreOdd::new("1-0", 2.0), ScoreOdd::new("0-0", 4.0), ScoreOdd::new("1-1", 3.0)]
    }

    fn meeting(id: u64, home: &str, away: &str) -> HeadToHeadMatch {
        HeadToHeadMatch {
            id,
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: 1,
            away_score: 1,
            match_date: "2023-05-01".to_string(),
        }
    }

    #[tokio::test]
    async fn test_baseline_engine_matches_analyzer() {
        let generated = PredictionEngine::baseline()
            .generate_prediction(&input(reference_odds()), &[])
            .await
            .unwrap();

        let p = &generated.prediction;
        assert_eq!(p.predicted_score, "1-0");
        assert_eq!(p.confidence, 58);
        assert_eq!(p.source, PredictionSource::Baseline);
        assert_eq!(generated.alternative_scores, vec!["1-1".to_string(), "0-0".to_string()]);
        assert!(!generated.head_to_head_applied);
    }

    #[tokio::test]
    async fn test_too_few_odds_is_rejected() {
        let mut odds = reference_odds();
        odds[2] = ScoreOdd::new("1-1", Coefficient::Text("x".into()));
        let err = PredictionEngine::baseline()
            .generate_prediction(&input(odds), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_team_is_rejected() {
        let mut match_input = input(reference_odds());
        match_input.away_team = "   ".to_string();
        assert!(validate_input(&match_input).is_err());
    }

    #[tokio::test]
    async fn test_head_to_head_bonus() {
        let history = vec![
            meeting(1, "Chelsea", "Arsenal"),
            meeting(2, "Arsenal", "Chelsea"),
            meeting(3, "Chelsea", "Arsenal"),
            meeting(4, "Liverpool", "Arsenal"),
        ];
        let generated = PredictionEngine::baseline()
            .generate_prediction(&input(reference_odds()), &history)
            .await
            .unwrap();

        assert!(generated.head_to_head_applied);
        assert_eq!(generated.prediction.confidence, 63);
        assert_eq!(generated.head_to_head.unwrap().total_matches, 3);
    }

    #[tokio::test]
    async fn test_falls_back_when_enhanced_unavailable() {
        let enhanced = EnhancedPredictor::new(GeneticConfig::default(), 1.0, Duration::ZERO, Some(5));
        let engine = PredictionEngine::new(OddsAnalyzer::default(), Some(enhanced));
        let generated = engine.generate_prediction(&input(reference_odds()), &[]).await.unwrap();

        assert_eq!(generated.prediction.source, PredictionSource::BaselineFallback);
        assert_eq!(generated.prediction.predicted_score, "1-0");
        assert_eq!(generated.prediction.confidence, 58);
    }

    #[tokio::test]
    async fn test_enhanced_path_output_domain() {
        let enhanced = EnhancedPredictor::new(
            GeneticConfig { generations: 30, ..GeneticConfig::default() },
            0.0,
            Duration::ZERO,
            Some(11),
        );
        let engine = PredictionEngine::new(OddsAnalyzer::default(), Some(enhanced));
        let generated = engine.generate_prediction(&input(reference_odds()), &[]).await.unwrap();

        let p = &generated.prediction;
        assert_eq!(p.source, PredictionSource::Enhanced);
        assert!(p.confidence <= 95);
        assert_eq!(p.top_predictions.len(), 3);
        assert!(!generated.alternative_scores.contains(&p.predicted_score));
    }

    #[tokio::test]
    async fn test_enhanced_top_predictions_come_from_input() {
        let enhanced = EnhancedPredictor::new(
            GeneticConfig { generations: 20, ..GeneticConfig::default() },
            0.0,
            Duration::ZERO,
            Some(1),
        );
        let engine = PredictionEngine::new(OddsAnalyzer::default(), Some(enhanced));
        let odds = vec![ScoreOdd::new("3-3", 40.0), ScoreOdd::new("4-4", 90.0), ScoreOdd::new("5-0", 120.0)];
        let generated = engine.generate_prediction(&input(odds), &[]).await.unwrap();

        let p = &generated.prediction;
        assert_eq!(p.source, PredictionSource::Enhanced);
        let scores: Vec<&str> = p.top_predictions.iter().map(|t| t.score.as_str()).collect();
        assert_eq!(scores, vec!["3-3", "4-4", "5-0"]);
        // The grid's picks are still offered, as alternatives
        assert!(!generated.alternative_scores.is_empty());
        let unique: std::collections::HashSet<_> = generated.alternative_scores.iter().collect();
        assert_eq!(unique.len(), generated.alternative_scores.len());
    }
}
