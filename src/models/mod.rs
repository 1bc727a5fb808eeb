use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmaker coefficient as entered by the user. Free-form text is accepted
/// so that a bad entry can be dropped from analysis instead of failing the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coefficient {
    Number(f64),
    Text(String),
}

impl Coefficient {
    /// The coefficient as a usable decimal, or `None` when it is non-numeric,
    /// non-finite or not strictly positive.
    pub fn value(&self) -> Option<f64> {
        let value = match self {
            Coefficient::Number(n) => *n,
            Coefficient::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        (value.is_finite() && value > 0.0).then_some(value)
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Coefficient::Number(value)
    }
}

/// Serialized with its derived `probability`; any incoming `probability` is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreOdd {
    pub score: String, // "H-A"
    pub coefficient: Coefficient,
}

impl ScoreOdd {
    pub fn new(score: impl Into<String>, coefficient: impl Into<Coefficient>) -> Self {
        Self {
            score: score.into(),
            coefficient: coefficient.into(),
        }
    }

    /// Implied probability in percent, always derived from the coefficient.
    pub fn probability(&self) -> Option<f64> {
        self.coefficient.value().map(crate::utils::implied_probability)
    }

    /// Usable for analysis: non-empty score and a positive numeric coefficient.
    pub fn is_valid(&self) -> bool {
        !self.score.trim().is_empty() && self.coefficient.value().is_some()
    }
}

impl Serialize for ScoreOdd {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ScoreOdd", 3)?;
        state.serialize_field("score", &self.score)?;
        state.serialize_field("coefficient", &self.coefficient)?;
        state.serialize_field("probability", &self.probability().map(crate::utils::round1))?;
        state.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInput {
    pub home_team: String,
    pub away_team: String,
    pub date_time: String,
    pub score_odds: Vec<ScoreOdd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    pub score: String,
    pub probability: f64, // percent, one decimal
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualResult {
    pub actual_score: String,
    pub correct: bool,
}

/// Which engine path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Genetic search blended with the Poisson score grid.
    Enhanced,
    /// Odds analyzer only, chosen up front.
    Baseline,
    /// Odds analyzer used because the enhanced path failed.
    BaselineFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Assigned by the prediction store; zero until stored.
    pub id: u64,
    pub home_team: String,
    pub away_team: String,
    pub match_date_time: String,
    pub score_odds: Vec<ScoreOdd>,
    pub predicted_score: String,
    pub confidence: u8, // 0..=95
    pub top_predictions: Vec<TopPrediction>,
    pub source: PredictionSource,
    pub methodology: String,
    pub timestamp: DateTime<Utc>,
    pub actual_result: Option<ActualResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionUpdate {
    pub actual_result: Option<ActualResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadMatch {
    pub id: u64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub match_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHeadToHeadMatch {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub match_date: Option<String>,
}

/// Static descriptive weights for a team, each roughly in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamCoefficientProfile {
    pub attack: f64,
    pub defense: f64,
    pub form: f64,
    pub home: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total_predictions: usize,
    pub completed_predictions: usize,
    pub correct_predictions: usize,
    pub accuracy_rate: u32, // rounded percent
    pub pending_predictions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePerformance {
    pub score: String,
    pub accuracy: u32,
    pub total: usize,
}

/// What the result collaborator knows about a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchStatus {
    Finished { final_score: String },
    Live { current_score: String, minute: u32 },
    NotStarted { scheduled_time: String },
    /// The check itself failed for this prediction
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultCheck {
    pub prediction_id: u64,
    pub status: MatchStatus,
    pub actual_result: Option<ActualResult>,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
