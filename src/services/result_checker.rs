use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::models::{MatchStatus, Prediction, ResultCheck};
use crate::store::PredictionStore;
use crate::utils::{normalize_team_name, parse_match_datetime};

const MATCH_LENGTH_MINUTES: i64 = 90;

/// Final-score scenarios (low, medium, high, very high scoring) and their weights
const SCENARIOS: [(&[&str], f64); 4] = [
    (&["0-0", "1-0", "0-1"], 0.25),
    (&["1-1", "2-0", "0-2"], 0.35),
    (&["2-1", "1-2", "3-0", "0-3"], 0.30),
    (&["2-2", "3-1", "1-3"], 0.10),
];

/// Simulated live-score source.
///
/// A match is not started before kick-off, live for the first 90 minutes and
/// finished afterwards. Scores are drawn once per match and cached for `ttl`.
pub struct ResultChecker {
    ttl: Duration,
    latency: Duration,
    cache: Mutex<HashMap<String, (Instant, MatchStatus)>>,
    rng: Mutex<ChaCha8Rng>,
}

impl ResultChecker {
    pub fn new(ttl: Duration, latency: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            ttl,
            latency,
            cache: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Status of the match a prediction refers to
    pub async fn match_status(&self, prediction: &Prediction) -> MatchStatus {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.status_at(prediction, Utc::now())
    }

    /// Status as seen at `now`; cached entries are reused until they expire
    pub fn status_at(&self, prediction: &Prediction, now: DateTime<Utc>) -> MatchStatus {
        let key = format!(
            "{}-{}-{}",
            normalize_team_name(&prediction.home_team),
            normalize_team_name(&prediction.away_team),
            prediction.match_date_time.trim()
        );

        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((fetched, status)) = cache.get(&key) {
            if fetched.elapsed() < self.ttl {
                return status.clone();
            }
        }

        let status = match parse_match_datetime(&prediction.match_date_time) {
            Some(kickoff) if kickoff > now => MatchStatus::NotStarted {
                scheduled_time: prediction.match_date_time.clone(),
            },
            Some(kickoff) if (now - kickoff).num_minutes() < MATCH_LENGTH_MINUTES => MatchStatus::Live {
                current_score: self.random_score(),
                minute: (now - kickoff).num_minutes().max(0) as u32,
            },
            Some(_) => MatchStatus::Finished {
                final_score: self.random_score(),
            },
            None => MatchStatus::NotStarted {
                scheduled_time: prediction.match_date_time.clone(),
            },
        };

        let ttl = self.ttl;
        cache.retain(|_, (fetched, _)| fetched.elapsed() < ttl);
        cache.insert(key, (Instant::now(), status.clone()));
        status
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Check one stored prediction and settle it when the match has finished
    pub async fn verify(&self, store: &PredictionStore, prediction: &Prediction) -> Result<ResultCheck> {
        let status = self.match_status(prediction).await;
        let actual_result = match &status {
            MatchStatus::Finished { final_score } => {
                store.update_result(prediction.id, final_score).await?.actual_result
            }
            _ => None,
        };
        Ok(ResultCheck {
            prediction_id: prediction.id,
            status,
            actual_result,
        })
    }

    /// Walk every pending prediction one at a time
    pub async fn check_all_pending(&self, store: &PredictionStore) -> Result<Vec<ResultCheck>> {
        let pending = store.pending().await;
        Ok(self.check_each(store, &pending).await)
    }

    /// A failed check is recorded against its prediction and the walk goes on
    async fn check_each(&self, store: &PredictionStore, predictions: &[Prediction]) -> Vec<ResultCheck> {
        let mut checks = Vec::with_capacity(predictions.len());
        for prediction in predictions {
            let check = match self.verify(store, prediction).await {
                Ok(check) => check,
                Err(e) => {
                    tracing::warn!("Result check failed for prediction {}: {}", prediction.id, e);
                    ResultCheck {
                        prediction_id: prediction.id,
                        status: MatchStatus::Error { message: e.to_string() },
                        actual_result: None,
                    }
                }
            };
            checks.push(check);
        }

        let finished = checks.iter().filter(|c| c.actual_result.is_some()).count();
        let failed = checks
            .iter()
            .filter(|c| matches!(c.status, MatchStatus::Error { .. }))
            .count();
        tracing::info!(
            "Checked {} pending predictions, {} finished, {} failed",
            checks.len(),
            finished,
            failed
        );
        checks
    }

    fn random_score(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ticket: f64 = rng.gen();
        let scenario = SCENARIOS
            .iter()
            .find(|(_, weight)| {
                ticket -= weight;
                ticket <= 0.0
            })
            .map_or(SCENARIOS[SCENARIOS.len() - 1].0, |(scores, _)| *scores);
        scenario[rng.gen_range(0..scenario.len())].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictionSource, ScoreOdd};
    use chrono::TimeZone;

    fn prediction(date: &str) -> Prediction {
        Prediction {
            id: 0,
            home_team: "Chelsea".to_string(),
            away_team: "Arsenal".to_string(),
            match_date_time: date.to_string(),
            score_odds: vec![ScoreOdd::new("1-0", 2.0)],
            predicted_score: "1-0".to_string(),
            confidence: 50,
            top_predictions: Vec::new(),
            source: PredictionSource::Baseline,
            methodology: "test".to_string(),
            timestamp: Utc::now(),
            actual_result: None,
        }
    }

    fn is_known_score(score: &str) -> bool {
        SCENARIOS.iter().any(|(scores, _)| scores.contains(&score))
    }

    #[test]
    fn test_status_by_kickoff_time() {
        let checker = ResultChecker::new(Duration::ZERO, Duration::ZERO, Some(1));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap();

        match checker.status_at(&prediction("2024-01-15 18:00"), now) {
            MatchStatus::NotStarted { .. } => {}
            other => panic!("expected not started, got {:?}", other),
        }
        match checker.status_at(&prediction("2024-01-15 15:30"), now) {
            MatchStatus::Live { minute, current_score } => {
                assert_eq!(minute, 30);
                assert!(is_known_score(&current_score));
            }
            other => panic!("expected live, got {:?}", other),
        }
        match checker.status_at(&prediction("2024-01-15 12:00"), now) {
            MatchStatus::Finished { final_score } => assert!(is_known_score(&final_score)),
            other => panic!("expected finished, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_reuses_status() {
        let checker = ResultChecker::new(Duration::from_secs(120), Duration::ZERO, Some(2));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap();
        let p = prediction("2024-01-15 12:00");

        let first = checker.status_at(&p, now);
        for _ in 0..10 {
            assert_eq!(checker.status_at(&p, now), first);
        }
        assert_eq!(checker.cache_size(), 1);
        checker.clear_cache();
        assert_eq!(checker.cache_size(), 0);
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let checker = ResultChecker::new(Duration::ZERO, Duration::ZERO, Some(4));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap();

        checker.status_at(&prediction("2024-01-14 12:00"), now);
        checker.status_at(&prediction("2024-01-13 12:00"), now);
        checker.status_at(&prediction("2024-01-12 12:00"), now);
        assert_eq!(checker.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_failed_check_does_not_abort_batch() {
        let store = PredictionStore::new(Duration::ZERO);
        let stored = store.create(prediction("2020-06-01 15:00")).await;
        let mut missing = prediction("2020-05-01 15:00");
        missing.id = 42;

        let checker = ResultChecker::new(Duration::from_secs(120), Duration::ZERO, Some(6));
        let checks = checker.check_each(&store, &[missing, stored]).await;

        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].prediction_id, 42);
        assert!(matches!(checks[0].status, MatchStatus::Error { .. }));
        assert!(checks[0].actual_result.is_none());
        assert_eq!(checks[1].prediction_id, 1);
        assert!(checks[1].actual_result.is_some());
        assert!(store.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_check_all_pending_settles_finished_matches() {
        let store = PredictionStore::new(Duration::ZERO);
        store.create(prediction("2020-06-01 15:00")).await;
        store.create(prediction("2999-06-01 15:00")).await;

        let checker = ResultChecker::new(Duration::from_secs(120), Duration::ZERO, Some(3));
        let checks = checker.check_all_pending(&store).await.unwrap();

        assert_eq!(checks.len(), 2);
        assert!(checks[0].actual_result.is_some());
        assert!(checks[1].actual_result.is_none());
        assert_eq!(store.pending().await.len(), 1);

        let settled = store.get_by_id(1).await.unwrap();
        let result = settled.actual_result.unwrap();
        assert_eq!(result.correct, result.actual_score == "1-0");
    }
}
