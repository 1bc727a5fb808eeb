use serde::Serialize;

use crate::models::HeadToHeadMatch;
use crate::utils::{normalize_team_name, percentage, round1};

/// Matches required before the record is trusted as a confidence input
pub const MIN_MEANINGFUL_MATCHES: usize = 3;
pub const CONFIDENCE_BONUS: u8 = 5;
const MAX_CONFIDENCE: u8 = 95;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRecord {
    pub name: String,
    pub matches: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub goals_for: u32,
    pub goals_against: u32,
    pub win_percentage: u32,
    pub draw_percentage: u32,
    pub loss_percentage: u32,
    pub avg_goals_for: f64,
    pub avg_goals_against: f64,
    pub goal_difference: i64,
}

impl TeamRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            matches: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            win_percentage: 0,
            draw_percentage: 0,
            loss_percentage: 0,
            avg_goals_for: 0.0,
            avg_goals_against: 0.0,
            goal_difference: 0,
        }
    }

    fn record(&mut self, scored: u32, conceded: u32) {
        self.matches += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => self.wins += 1,
            std::cmp::Ordering::Equal => self.draws += 1,
            std::cmp::Ordering::Less => self.losses += 1,
        }
    }

    fn finalize(&mut self) {
        self.win_percentage = percentage(self.wins, self.matches);
        self.draw_percentage = percentage(self.draws, self.matches);
        self.loss_percentage = percentage(self.losses, self.matches);
        if self.matches > 0 {
            self.avg_goals_for = round1(self.goals_for as f64 / self.matches as f64);
            self.avg_goals_against = round1(self.goals_against as f64 / self.matches as f64);
        }
        self.goal_difference = self.goals_for as i64 - self.goals_against as i64;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadSummary {
    pub total_matches: usize,
    /// Wins by whichever side was at home in that fixture
    pub home_wins: usize,
    pub away_wins: usize,
    pub draws: usize,
    pub team_a: TeamRecord,
    pub team_b: TeamRecord,
}

impl HeadToHeadSummary {
    pub fn is_meaningful(&self) -> bool {
        self.total_matches >= MIN_MEANINGFUL_MATCHES
    }

    /// Confidence after the head-to-head adjustment: +5 (capped at 95) when meaningful
    pub fn adjust_confidence(&self, confidence: u8) -> u8 {
        if self.is_meaningful() {
            confidence.saturating_add(CONFIDENCE_BONUS).min(MAX_CONFIDENCE)
        } else {
            confidence
        }
    }
}

/// Aggregate the meetings between `team_a` and `team_b`, in either venue.
/// Matches involving any other team are ignored.
pub fn summarize(team_a: &str, team_b: &str, matches: &[HeadToHeadMatch]) -> HeadToHeadSummary {
    let a_key = normalize_team_name(team_a);
    let b_key = normalize_team_name(team_b);

    let mut summary = HeadToHeadSummary {
        total_matches: 0,
        home_wins: 0,
        away_wins: 0,
        draws: 0,
        team_a: TeamRecord::new(team_a),
        team_b: TeamRecord::new(team_b),
    };

    for m in matches {
        let home = normalize_team_name(&m.home_team);
        let away = normalize_team_name(&m.away_team);

        let a_is_home = if home == a_key && away == b_key {
            true
        } else if home == b_key && away == a_key {
            false
        } else {
            continue;
        };

        summary.total_matches += 1;
        match m.home_score.cmp(&m.away_score) {
            std::cmp::Ordering::Greater => summary.home_wins += 1,
            std::cmp::Ordering::Less => summary.away_wins += 1,
            std::cmp::Ordering::Equal => summary.draws += 1,
        }

        let (a_goals, b_goals) = if a_is_home {
            (m.home_score, m.away_score)
        } else {
            (m.away_score, m.home_score)
        };
        summary.team_a.record(a_goals, b_goals);
        summary.team_b.record(b_goals, a_goals);
    }

    summary.team_a.finalize();
    summary.team_b.finalize();
    summary
}
