use std::sync::Mutex;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::{PredictorError, Result};
use crate::models::ScoreOdd;
use crate::services::genetic::{GeneticConfig, GeneticOptimizer, GeneticOutcome};
use crate::services::poisson::{score_grid, ScoreProbability};
use crate::services::team_profiles::{Side, TeamProfiles};
use crate::utils::clamp_confidence;

pub const METHODOLOGY: &str = "Genetic search + Poisson score grid";
const CONVERGENCE_BONUS: f64 = 10.0;
const GENETIC_WEIGHT: f64 = 0.4;
const MATH_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Serialize)]
pub struct EnhancedPrediction {
    pub recommended_score: String,
    pub alternative_scores: Vec<String>,
    pub confidence: u8,
    pub methodology: &'static str,
    pub converged: bool,
    pub genetic: GeneticOutcome,
    /// All 36 grid cells, highest adjusted probability first
    pub mathematical_probabilities: Vec<ScoreProbability>,
}

/// Merge the evolutionary result with the Poisson grid.
///
/// The grid's best score always wins; agreement between the two methods earns
/// a convergence bonus, disagreement lists the genetic pick as an alternative.
pub fn combine(genetic: GeneticOutcome, grid: Vec<ScoreProbability>) -> EnhancedPrediction {
    let math_best = grid.first().map(|c| c.score.clone()).unwrap_or_else(|| "0-0".to_string());
    let math_confidence = grid.first().map_or(0.0, |c| c.probability);
    let converged = genetic.best_score == math_best;

    let genetic_confidence = (genetic.fitness * 10.0).min(95.0);
    let bonus = if converged { CONVERGENCE_BONUS } else { 0.0 };
    let confidence = clamp_confidence(genetic_confidence * GENETIC_WEIGHT + math_confidence * MATH_WEIGHT + bonus);

    let alternative_scores = if converged {
        Vec::new()
    } else {
        vec![genetic.best_score.clone()]
    };

    EnhancedPrediction {
        recommended_score: math_best,
        alternative_scores,
        confidence,
        methodology: METHODOLOGY,
        converged,
        genetic,
        mathematical_probabilities: grid,
    }
}

/// Stand-in for the remote enhanced prediction service: runs the models
/// locally but can report itself unavailable at a configured rate.
pub struct EnhancedPredictor {
    profiles: TeamProfiles,
    config: GeneticConfig,
    failure_rate: f64,
    latency: Duration,
    rng: Mutex<ChaCha8Rng>,
}

impl EnhancedPredictor {
    pub fn new(config: GeneticConfig, failure_rate: f64, latency: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            profiles: TeamProfiles::new(),
            config,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency,
            rng: Mutex::new(rng),
        }
    }

    pub async fn predict(&self, home_team: &str, away_team: &str, odds: &[ScoreOdd]) -> Result<EnhancedPrediction> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let home = self.profiles.lookup(home_team, Side::Home);
        let away = self.profiles.lookup(away_team, Side::Away);

        let genetic = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if rng.gen::<f64>() < self.failure_rate {
                return Err(PredictorError::EnrichmentUnavailable(
                    "enhanced prediction service temporarily unavailable".to_string(),
                ));
            }
            GeneticOptimizer::new(&self.config, &mut *rng).run(&home, &away)
        };

        let grid = score_grid(&home, &away, odds);
        let prediction = combine(genetic, grid);

        tracing::debug!(
            "Enhanced prediction {} vs {}: {} ({}%), genetic {} fitness {:.2}",
            home_team,
            away_team,
            prediction.recommended_score,
            prediction.confidence,
            prediction.genetic.best_score,
            prediction.genetic.fitness
        );

        Ok(prediction)
    }
}
