//! In-memory prediction and head-to-head stores.
//!
//! Both stores live for the lifetime of the process. Each call awaits the
//! configured latency first so callers see the same suspension points a
//! remote store would impose.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{PredictorError, Result};
use crate::models::*;
use crate::utils::{normalize_team_name, parse_match_datetime, percentage};

/// Head-to-head history is capped; additions beyond this are rejected
pub const MAX_HEAD_TO_HEAD: usize = 10;
/// Predicted scores need this many completed predictions to be ranked
const MIN_SCORE_SAMPLES: usize = 3;

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[derive(Clone, Default)]
pub struct PredictionStore {
    predictions: Arc<RwLock<Vec<Prediction>>>,
    latency: Duration,
}

impl PredictionStore {
    pub fn new(latency: Duration) -> Self {
        Self {
            predictions: Arc::new(RwLock::new(Vec::new())),
            latency,
        }
    }

    /// Store a prediction under the next id (`max(existing) + 1`).
    pub async fn create(&self, mut prediction: Prediction) -> Prediction {
        simulate_latency(self.latency).await;
        let mut predictions = self.predictions.write().await;

        let highest = predictions.iter().map(|p| p.id).max().unwrap_or(0);
        prediction.id = highest + 1;
        predictions.push(prediction.clone());

        tracing::info!(
            "Stored prediction #{}: {} vs {} -> {} ({}%)",
            prediction.id,
            prediction.home_team,
            prediction.away_team,
            prediction.predicted_score,
            prediction.confidence
        );
        prediction
    }

    pub async fn get_all(&self) -> Vec<Prediction> {
        simulate_latency(self.latency).await;
        self.predictions.read().await.clone()
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Prediction> {
        simulate_latency(self.latency).await;
        self.predictions
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(PredictorError::LookupNotFound(id))
    }

    /// Apply a partial update. Only the actual result is ever mutable.
    pub async fn update(&self, id: u64, update: PredictionUpdate) -> Result<Prediction> {
        simulate_latency(self.latency).await;
        let mut predictions = self.predictions.write().await;
        let prediction = predictions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PredictorError::LookupNotFound(id))?;

        if let Some(result) = update.actual_result {
            prediction.actual_result = Some(result);
        }
        Ok(prediction.clone())
    }

    /// Attach the actual score; correct when it equals the predicted score.
    pub async fn update_result(&self, id: u64, actual_score: &str) -> Result<Prediction> {
        let predicted = self.get_by_id(id).await?.predicted_score;
        let actual_score = actual_score.trim().to_string();
        let correct = predicted == actual_score;

        let updated = self
            .update(
                id,
                PredictionUpdate {
                    actual_result: Some(ActualResult { actual_score, correct }),
                },
            )
            .await?;

        tracing::info!("Prediction #{} settled: correct={}", id, correct);
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> Result<Prediction> {
        simulate_latency(self.latency).await;
        let mut predictions = self.predictions.write().await;
        let index = predictions
            .iter()
            .position(|p| p.id == id)
            .ok_or(PredictorError::LookupNotFound(id))?;
        Ok(predictions.remove(index))
    }

    /// Predictions whose home team contains `home_team` or whose away team contains `away_team`
    pub async fn get_by_teams(&self, home_team: &str, away_team: &str) -> Vec<Prediction> {
        let home = normalize_team_name(home_team);
        let away = normalize_team_name(away_team);
        self.get_all()
            .await
            .into_iter()
            .filter(|p| {
                normalize_team_name(&p.home_team).contains(&home)
                    || normalize_team_name(&p.away_team).contains(&away)
            })
            .collect()
    }

    /// Predictions whose match date-time parses and falls within `[start, end]`
    pub async fn get_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Prediction> {
        self.get_all()
            .await
            .into_iter()
            .filter(|p| {
                parse_match_datetime(&p.match_date_time).is_some_and(|dt| dt >= start && dt <= end)
            })
            .collect()
    }

    pub async fn pending(&self) -> Vec<Prediction> {
        self.get_all()
            .await
            .into_iter()
            .filter(|p| p.actual_result.is_none())
            .collect()
    }

    pub async fn accuracy_stats(&self) -> AccuracyStats {
        let predictions = self.get_all().await;
        let completed: Vec<_> = predictions.iter().filter_map(|p| p.actual_result.as_ref()).collect();
        let correct = completed.iter().filter(|r| r.correct).count();

        AccuracyStats {
            total_predictions: predictions.len(),
            completed_predictions: completed.len(),
            correct_predictions: correct,
            accuracy_rate: percentage(correct, completed.len()),
            pending_predictions: predictions.len() - completed.len(),
        }
    }

    /// Best-performing predicted scores (at least three settled predictions each), top five
    pub async fn top_performing_scores(&self) -> Vec<ScorePerformance> {
        let mut by_score: HashMap<String, (usize, usize)> = HashMap::new();
        for p in self.get_all().await {
            if let Some(result) = &p.actual_result {
                let entry = by_score.entry(p.predicted_score.clone()).or_default();
                entry.0 += 1;
                if result.correct {
                    entry.1 += 1;
                }
            }
        }

        let mut ranked: Vec<ScorePerformance> = by_score
            .into_iter()
            .filter(|(_, (total, _))| *total >= MIN_SCORE_SAMPLES)
            .map(|(score, (total, correct))| ScorePerformance {
                score,
                accuracy: percentage(correct, total),
                total,
            })
            .collect();

        ranked.sort_by(|a, b| b.accuracy.cmp(&a.accuracy).then_with(|| a.score.cmp(&b.score)));
        ranked.truncate(5);
        ranked
    }

    /// Render the prediction history as CSV
    pub async fn export_csv(&self) -> Result<String> {
        let predictions = self.get_all().await;
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record([
            "id",
            "home_team",
            "away_team",
            "match_date_time",
            "predicted_score",
            "confidence",
            "source",
            "actual_score",
            "correct",
            "timestamp",
        ])?;

        for p in &predictions {
            let (actual, correct) = match &p.actual_result {
                Some(r) => (r.actual_score.clone(), r.correct.to_string()),
                None => (String::new(), String::new()),
            };
            writer.write_record([
                p.id.to_string(),
                p.home_team.clone(),
                p.away_team.clone(),
                p.match_date_time.clone(),
                p.predicted_score.clone(),
                p.confidence.to_string(),
                format!("{:?}", p.source),
                actual,
                correct,
                p.timestamp.to_rfc3339(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PredictorError::Internal(format!("CSV export failed: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| PredictorError::Internal(e.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct HeadToHeadStore {
    inner: Arc<RwLock<HeadToHeadState>>,
    latency: Duration,
}

#[derive(Default)]
struct HeadToHeadState {
    matches: Vec<HeadToHeadMatch>,
    next_id: u64,
}

impl HeadToHeadStore {
    pub fn new(latency: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HeadToHeadState::default())),
            latency,
        }
    }

    pub async fn add(&self, new_match: NewHeadToHeadMatch) -> Result<HeadToHeadMatch> {
        let home_team = new_match.home_team.trim().to_string();
        let away_team = new_match.away_team.trim().to_string();
        if home_team.is_empty() || away_team.is_empty() {
            return Err(PredictorError::Validation("both team names are required".to_string()));
        }

        simulate_latency(self.latency).await;
        let mut state = self.inner.write().await;
        if state.matches.len() >= MAX_HEAD_TO_HEAD {
            tracing::warn!("Rejected head-to-head match: history already holds {}", MAX_HEAD_TO_HEAD);
            return Err(PredictorError::HeadToHeadFull { max: MAX_HEAD_TO_HEAD });
        }

        state.next_id += 1;
        let record = HeadToHeadMatch {
            id: state.next_id,
            home_team,
            away_team,
            home_score: new_match.home_score,
            away_score: new_match.away_score,
            match_date: new_match
                .match_date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
        };
        state.matches.push(record.clone());

        tracing::info!(
            "Added head-to-head #{}: {} {}-{} {}",
            record.id,
            record.home_team,
            record.home_score,
            record.away_score,
            record.away_team
        );
        Ok(record)
    }

    pub async fn remove(&self, id: u64) -> Result<HeadToHeadMatch> {
        simulate_latency(self.latency).await;
        let mut state = self.inner.write().await;
        let index = state
            .matches
            .iter()
            .position(|m| m.id == id)
            .ok_or(PredictorError::HeadToHeadNotFound(id))?;
        Ok(state.matches.remove(index))
    }

    pub async fn clear(&self) {
        simulate_latency(self.latency).await;
        self.inner.write().await.matches.clear();
        tracing::info!("Head-to-head history cleared");
    }

    pub async fn get_all(&self) -> Vec<HeadToHeadMatch> {
        simulate_latency(self.latency).await;
        self.inner.read().await.matches.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prediction(home: &str, away: &str, score: &str, date: &str) -> Prediction {
        Prediction {
            id: 0,
            home_team: home.to_string(),
            away_team: away.to_string(),
            match_date_time: date.to_string(),
            score_odds: vec![ScoreOdd::new(score, 2.0)],
            predicted_score: score.to_string(),
            confidence: 50,
            top_predictions: Vec::new(),
            source: PredictionSource::Baseline,
            methodology: "test".to_string(),
            timestamp: Utc::now(),
            actual_result: None,
        }
    }

    fn meeting(home: &str, away: &str) -> NewHeadToHeadMatch {
        NewHeadToHeadMatch {
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: 1,
            away_score: 0,
            match_date: None,
        }
    }

    #[tokio::test]
    async fn test_ids_are_max_plus_one() {
        let store = PredictionStore::new(Duration::ZERO);
        let first = store.create(prediction("A", "B", "1-0", "2024-01-15 15:00")).await;
        let second = store.create(prediction("C", "D", "0-0", "2024-01-16 15:00")).await;
        assert_eq!((first.id, second.id), (1, 2));

        store.delete(1).await.unwrap();
        let third = store.create(prediction("E", "F", "2-1", "2024-01-17 15:00")).await;
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_update_result_and_stats() {
        let store = PredictionStore::new(Duration::ZERO);
        store.create(prediction("A", "B", "1-0", "2024-01-15 15:00")).await;
        store.create(prediction("C", "D", "0-0", "2024-01-16 15:00")).await;
        store.create(prediction("E", "F", "2-1", "2024-01-17 15:00")).await;

        let settled = store.update_result(1, " 1-0 ").await.unwrap();
        assert_eq!(settled.actual_result, Some(ActualResult { actual_score: "1-0".into(), correct: true }));
        let missed = store.update_result(2, "1-1").await.unwrap();
        assert!(!missed.actual_result.unwrap().correct);

        let stats = store.accuracy_stats().await;
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.completed_predictions, 2);
        assert_eq!(stats.correct_predictions, 1);
        assert_eq!(stats.accuracy_rate, 50);
        assert_eq!(stats.pending_predictions, 1);
        assert_eq!(store.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_lookup_error() {
        let store = PredictionStore::new(Duration::ZERO);
        let err = store.update(42, PredictionUpdate::default()).await.unwrap_err();
        assert!(matches!(err, PredictorError::LookupNotFound(42)));
        assert!(store.update_result(7, "1-0").await.is_err());
        assert!(store.delete(7).await.is_err());
    }

    #[tokio::test]
    async fn test_queries_by_team_and_date() {
        let store = PredictionStore::new(Duration::ZERO);
        store.create(prediction("Chelsea", "Arsenal", "1-0", "2024-01-15 15:00")).await;
        store.create(prediction("Liverpool", "Newcastle", "2-0", "2024-02-20T20:00:00Z")).await;

        assert_eq!(store.get_by_teams("chel", "zzz").await.len(), 1);
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
        let in_range = store.get_by_date_range(start, end).await;
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].home_team, "Liverpool");
    }

    #[tokio::test]
    async fn test_top_performing_scores_needs_three_samples() {
        let store = PredictionStore::new(Duration::ZERO);
        for (i, actual) in ["1-0", "1-0", "0-0"].iter().enumerate() {
            store.create(prediction("A", "B", "1-0", "2024-01-15 15:00")).await;
            store.update_result(i as u64 + 1, actual).await.unwrap();
        }
        store.create(prediction("A", "B", "2-2", "2024-01-15 15:00")).await;
        store.update_result(4, "2-2").await.unwrap();

        let top = store.top_performing_scores().await;
        assert_eq!(top, vec![ScorePerformance { score: "1-0".into(), accuracy: 67, total: 3 }]);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let store = PredictionStore::new(Duration::ZERO);
        store.create(prediction("Chelsea", "Arsenal", "1-0", "2024-01-15 15:00")).await;
        let csv = store.export_csv().await.unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,home_team,away_team"));
        assert!(lines.next().unwrap().starts_with("1,Chelsea,Arsenal,2024-01-15 15:00,1-0,50"));
    }

    #[tokio::test]
    async fn test_head_to_head_cap() {
        let store = HeadToHeadStore::new(Duration::ZERO);
        for _ in 0..MAX_HEAD_TO_HEAD {
            store.add(meeting("Chelsea", "Arsenal")).await.unwrap();
        }
        let err = store.add(meeting("Chelsea", "Arsenal")).await.unwrap_err();
        assert!(matches!(err, PredictorError::HeadToHeadFull { max: 10 }));
        assert_eq!(store.get_all().await.len(), 10);
    }

    #[tokio::test]
    async fn test_head_to_head_remove_and_clear() {
        let store = HeadToHeadStore::new(Duration::ZERO);
        let first = store.add(meeting("Chelsea", "Arsenal")).await.unwrap();
        let second = store.add(meeting("Arsenal", "Chelsea")).await.unwrap();
        assert!(second.id > first.id);
        assert!(!first.match_date.is_empty());

        store.remove(first.id).await.unwrap();
        assert!(store.remove(first.id).await.is_err());
        assert_eq!(store.get_all().await.len(), 1);

        store.clear().await;
        assert!(store.get_all().await.is_empty());
        assert!(store.add(meeting(" ", "Arsenal")).await.is_err());
    }
}
