use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub enrichment_enabled: bool,
    /// Probability that a call to the enhanced predictor is reported unavailable.
    pub enrichment_failure_rate: f64,
    pub population_size: usize,
    pub generations: usize,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub simulated_latency: Duration,
    pub result_cache_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            enrichment_enabled: true,
            enrichment_failure_rate: 0.1,
            population_size: 50,
            generations: 100,
            seed: None,
            simulated_latency: Duration::ZERO,
            result_cache_ttl: Duration::from_secs(120),
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults for
    /// anything missing or malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            enrichment_enabled: env_or("ENRICHMENT_ENABLED", defaults.enrichment_enabled),
            enrichment_failure_rate: env_or("ENRICHMENT_FAILURE_RATE", defaults.enrichment_failure_rate)
                .clamp(0.0, 1.0),
            population_size: env_or("GA_POPULATION", defaults.population_size).max(2),
            generations: env_or("GA_GENERATIONS", defaults.generations).max(1),
            seed: env::var("PREDICTOR_SEED").ok().and_then(|s| parse_or_warn("PREDICTOR_SEED", &s)),
            simulated_latency: Duration::from_millis(env_or("SIMULATED_LATENCY_MS", 0u64)),
            result_cache_ttl: Duration::from_secs(env_or(
                "RESULT_CACHE_SECS",
                defaults.result_cache_ttl.as_secs(),
            )),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => parse_or_warn(key, &raw).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.population_size, 50);
        assert_eq!(settings.generations, 100);
        assert!(settings.seed.is_none());
    }

    #[test]
    fn test_parse_or_warn() {
        assert_eq!(parse_or_warn::<u16>("PORT", " 8080 "), Some(8080));
        assert_eq!(parse_or_warn::<u16>("PORT", "eighty"), None);
        assert_eq!(parse_or_warn::<bool>("ENRICHMENT_ENABLED", "false"), Some(false));
    }
}
