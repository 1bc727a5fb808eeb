use anyhow::{bail, Result};

use crate::config::Settings;
use crate::models::{Coefficient, MatchInput, ScoreOdd};
use crate::services::{MultiplierTiers, OddsAnalyzer, PredictionEngine, TeamProfiles};

/// Parse a `SCORE=COEF` pair such as `2-1=7.5`.
///
/// A coefficient that is not a number is kept as text; the analyzer leaves it
/// out of the valid set.
pub fn parse_odd(pair: &str) -> Result<ScoreOdd> {
    let Some((score, coefficient)) = pair.split_once('=') else {
        bail!("expected SCORE=COEF, got '{}'", pair);
    };
    let score = score.trim();
    if score.is_empty() {
        bail!("missing score in '{}'", pair);
    }
    let coefficient = coefficient.trim();
    let coefficient = match coefficient.parse::<f64>() {
        Ok(value) => Coefficient::Number(value),
        Err(_) => Coefficient::Text(coefficient.to_string()),
    };
    Ok(ScoreOdd::new(score, coefficient))
}

pub fn parse_odds(pairs: &[String]) -> Result<Vec<ScoreOdd>> {
    pairs.iter().map(|p| parse_odd(p)).collect()
}

pub async fn predict_match(
    settings: &Settings,
    home_team: &str,
    away_team: &str,
    date_time: &str,
    odds: &[String],
    baseline_only: bool,
) -> Result<()> {
    let input = MatchInput {
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        date_time: date_time.to_string(),
        score_odds: parse_odds(odds)?,
    };

    let engine = if baseline_only {
        PredictionEngine::baseline()
    } else {
        PredictionEngine::from_settings(settings)
    };

    println!("🔮 Predicting {} vs {} ({})...", input.home_team, input.away_team, input.date_time);

    let generated = engine.generate_prediction(&input, &[]).await?;
    let prediction = &generated.prediction;

    println!("🎯 Predicted score: {}", prediction.predicted_score);
    println!("📊 Confidence: {}%", prediction.confidence);
    println!("🧠 Method: {} ({:?})", prediction.methodology, prediction.source);

    if !prediction.top_predictions.is_empty() {
        println!("\n📈 Most likely scores:");
        for (i, top) in prediction.top_predictions.iter().enumerate() {
            println!("{}. {} - {:.1}%", i + 1, top.score, top.probability);
        }
    }
    if !generated.alternative_scores.is_empty() {
        println!("\n🔁 Alternatives: {}", generated.alternative_scores.join(", "));
    }

    Ok(())
}

pub fn analyze_odds(odds: &[String], enhanced_tiers: bool) -> Result<()> {
    let tiers = if enhanced_tiers {
        MultiplierTiers::Enhanced
    } else {
        MultiplierTiers::Baseline
    };
    let analysis = OddsAnalyzer::new(tiers).analyze(&parse_odds(odds)?);

    if analysis.metadata.depth == 0 {
        println!("📭 No usable odds entries.");
        return Ok(());
    }

    println!("🎯 Most likely score: {} ({}%)", analysis.predicted_score, analysis.confidence);
    println!(
        "📐 {} valid odds, average coefficient {:.2}, multiplier x{:.3}{}",
        analysis.metadata.depth,
        analysis.metadata.avg_coefficient,
        analysis.metadata.confidence_multiplier,
        if analysis.metadata.clustering_bonus { " (clustered favourite)" } else { "" }
    );
    for top in &analysis.top_predictions {
        println!("   {} - {:.1}%", top.score, top.probability);
    }

    Ok(())
}

pub fn show_profiles() {
    println!("📋 Team coefficient profiles:");
    println!("{:<20} {:>7} {:>8} {:>6} {:>6}", "Team", "Attack", "Defense", "Form", "Home");
    for (team, p) in TeamProfiles::new().all() {
        println!("{:<20} {:>7.2} {:>8.2} {:>6.2} {:>6.2}", team, p.attack, p.defense, p.form, p.home);
    }
    println!("\nUnknown teams use a neutral 0.7 profile (0.3 home factor when playing away).");
}
