use serde::Serialize;
use statrs::distribution::{Discrete, Poisson};

use crate::models::{ScoreOdd, TeamCoefficientProfile};
use crate::services::odds_analyzer::valid_odds;
use crate::utils::{format_score, probability_to_odds, round1};

/// Goals per side covered by the grid (0..=MAX_GRID_GOALS)
pub const MAX_GRID_GOALS: u64 = 5;
const HOME_SCALE: f64 = 1.3;
const AWAY_SCALE: f64 = 1.1;
const AWAY_FORM_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreProbability {
    pub score: String,
    /// Adjusted probability in percent, one decimal
    pub probability: f64,
    /// Decimal odds implied by the adjusted probability
    pub coefficient: f64,
    /// Pure Poisson probability (fraction) before any bookmaker blend
    pub mathematical_base: f64,
    /// Unrounded adjusted fraction, used for ordering
    #[serde(skip)]
    adjusted: f64,
}

/// Expected goals (home, away) used for the score grid
pub fn expected_goals(home: &TeamCoefficientProfile, away: &TeamCoefficientProfile) -> (f64, f64) {
    let home_expected = (home.attack * (1.0 - away.defense) + home.form + home.home) * HOME_SCALE;
    let away_expected = (away.attack * (1.0 - home.defense) + away.form * AWAY_FORM_FACTOR) * AWAY_SCALE;
    (home_expected, away_expected)
}

/// P(X = k) for X ~ Poisson(lambda); a non-positive rate puts all mass on zero
pub fn poisson_probability(k: u64, lambda: f64) -> f64 {
    match Poisson::new(lambda) {
        Ok(dist) => dist.pmf(k),
        Err(_) => {
            if k == 0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Build the 6x6 score grid, blend in bookmaker odds where a cell's score was
/// quoted, and return cells sorted by adjusted probability (highest first).
pub fn score_grid(
    home: &TeamCoefficientProfile,
    away: &TeamCoefficientProfile,
    bookmaker_odds: &[ScoreOdd],
) -> Vec<ScoreProbability> {
    let (home_expected, away_expected) = expected_goals(home, away);
    let quoted = valid_odds(bookmaker_odds);

    let mut cells = Vec::with_capacity(((MAX_GRID_GOALS + 1) * (MAX_GRID_GOALS + 1)) as usize);
    for home_goals in 0..=MAX_GRID_GOALS {
        for away_goals in 0..=MAX_GRID_GOALS {
            let score = format_score(home_goals as u32, away_goals as u32);
            let base = poisson_probability(home_goals, home_expected)
                * poisson_probability(away_goals, away_expected);

            let adjusted = match quoted.iter().find(|odd| odd.score == score) {
                Some(odd) => (base + 1.0 / odd.coefficient) / 2.0,
                None => base,
            };

            cells.push(ScoreProbability {
                score,
                probability: round1(adjusted * 100.0),
                coefficient: (probability_to_odds(adjusted) * 100.0).round() / 100.0,
                mathematical_base: base,
                adjusted,
            });
        }
    }

    cells.sort_by(|a, b| b.adjusted.partial_cmp(&a.adjusted).unwrap_or(std::cmp::Ordering::Equal));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::team_profiles::{Side, TeamProfiles};

    fn neutral() -> (TeamCoefficientProfile, TeamCoefficientProfile) {
        (TeamProfiles::default_profile(Side::Home), TeamProfiles::default_profile(Side::Away))
    }

    #[test]
    fn test_poisson_probability() {
        assert!((poisson_probability(0, 1.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!((poisson_probability(2, 1.5) - 1.5f64.powi(2) * (-1.5f64).exp() / 2.0).abs() < 1e-12);
        assert_eq!(poisson_probability(0, 0.0), 1.0);
        assert_eq!(poisson_probability(3, -1.0), 0.0);
    }

    #[test]
    fn test_expected_goals() {
        let (home, away) = neutral();
        let (h, a) = expected_goals(&home, &away);
        assert!((h - (0.7 * 0.3 + 0.7 + 0.7) * 1.3).abs() < 1e-12);
        assert!((a - (0.7 * 0.3 + 0.7 * 0.8) * 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_grid_has_36_sorted_cells() {
        let (home, away) = neutral();
        let grid = score_grid(&home, &away, &[]);
        assert_eq!(grid.len(), 36);
        for pair in grid.windows(2) {
            assert!(pair[0].adjusted >= pair[1].adjusted);
        }
        let total: f64 = grid.iter().map(|c| c.mathematical_base).sum();
        assert!(total > 0.95 && total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_bookmaker_odds_are_blended() {
        let (home, away) = neutral();
        let plain = score_grid(&home, &away, &[]);
        let blended = score_grid(&home, &away, &[ScoreOdd::new("4-4", 2.0)]);

        let cell = blended.iter().find(|c| c.score == "4-4").unwrap();
        let base = plain.iter().find(|c| c.score == "4-4").unwrap().mathematical_base;
        assert!((cell.adjusted - (base + 0.5) / 2.0).abs() < 1e-12);
        assert_eq!(blended[0].score, "4-4");
    }
}
