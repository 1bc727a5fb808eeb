use rand::Rng;
use serde::Serialize;

use crate::models::TeamCoefficientProfile;
use crate::utils::format_score;

const MAX_FITNESS: f64 = 10.0;
const GOALS_SCALE: f64 = 2.5;
const GOAL_GENE_MUTATION: f64 = 0.3;
const WEIGHT_GENE_MUTATION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Goal genes are drawn from 0..=max_goals
    pub max_goals: u32,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            max_goals: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorWeights {
    pub attack: f64,
    pub defense: f64,
    pub form: f64,
    pub home_advantage: f64,
}

impl FactorWeights {
    fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            attack: rng.gen(),
            defense: rng.gen(),
            form: rng.gen(),
            home_advantage: rng.gen(),
        }
    }

    fn blend(&self, other: &Self) -> Self {
        Self {
            attack: (self.attack + other.attack) / 2.0,
            defense: (self.defense + other.defense) / 2.0,
            form: (self.form + other.form) / 2.0,
            home_advantage: (self.home_advantage + other.home_advantage) / 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub home_goals: u32,
    pub away_goals: u32,
    pub weights: FactorWeights,
}

impl Individual {
    pub fn score(&self) -> String {
        format_score(self.home_goals, self.away_goals)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneticOutcome {
    pub best_score: String,
    pub fitness: f64,
    pub generations: usize,
    pub weights: FactorWeights,
}

/// Expected goals for one side under a candidate's weights
pub fn expected_goals(
    team: &TeamCoefficientProfile,
    opponent: &TeamCoefficientProfile,
    weights: &FactorWeights,
    is_home: bool,
) -> f64 {
    let attack = team.attack * weights.attack;
    let defense = opponent.defense * weights.defense;
    let form = team.form * weights.form;
    let home = if is_home { team.home * weights.home_advantage } else { 0.0 };

    (attack - defense + form + home) * GOALS_SCALE
}

/// `max(0, 10 - |home error| - |away error|)`
pub fn fitness(
    individual: &Individual,
    home: &TeamCoefficientProfile,
    away: &TeamCoefficientProfile,
) -> f64 {
    let home_expected = expected_goals(home, away, &individual.weights, true);
    let away_expected = expected_goals(away, home, &individual.weights, false);

    let home_diff = (individual.home_goals as f64 - home_expected).abs();
    let away_diff = (individual.away_goals as f64 - away_expected).abs();

    (MAX_FITNESS - home_diff - away_diff).max(0.0)
}

/// Evolutionary search over (score, factor weights) candidates.
pub struct GeneticOptimizer<'a, R: Rng> {
    config: &'a GeneticConfig,
    rng: &'a mut R,
}

impl<'a, R: Rng> GeneticOptimizer<'a, R> {
    pub fn new(config: &'a GeneticConfig, rng: &'a mut R) -> Self {
        Self { config, rng }
    }

    /// Run the configured number of generations and return the fittest
    /// individual seen in any generation.
    pub fn run(&mut self, home: &TeamCoefficientProfile, away: &TeamCoefficientProfile) -> GeneticOutcome {
        let mut population = self.initial_population();
        let mut best: Option<(Individual, f64)> = None;

        for _ in 0..self.config.generations {
            let scores: Vec<f64> = population.iter().map(|i| fitness(i, home, away)).collect();

            if let Some((idx, &top)) = scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            {
                if best.as_ref().map_or(true, |(_, f)| top > *f) {
                    best = Some((population[idx].clone(), top));
                }
            }

            let parents = self.select_parents(&population, &scores);
            population = self.breed(&parents);
        }

        // generations >= 1 and population is never empty, but keep a sane answer regardless
        let (individual, best_fitness) = best.unwrap_or_else(|| {
            let first = population[0].clone();
            let f = fitness(&first, home, away);
            (first, f)
        });

        GeneticOutcome {
            best_score: individual.score(),
            fitness: best_fitness,
            generations: self.config.generations,
            weights: individual.weights,
        }
    }

    fn initial_population(&mut self) -> Vec<Individual> {
        let size = self.config.population_size.max(2);
        (0..size).map(|_| self.random_individual()).collect()
    }

    fn random_individual(&mut self) -> Individual {
        Individual {
            home_goals: self.rng.gen_range(0..=self.config.max_goals),
            away_goals: self.rng.gen_range(0..=self.config.max_goals),
            weights: FactorWeights::random(&mut *self.rng),
        }
    }

    /// Roulette-wheel selection of half the population
    fn select_parents(&mut self, population: &[Individual], scores: &[f64]) -> Vec<Individual> {
        let count = (population.len() / 2).max(2);
        let total: f64 = scores.iter().sum();

        (0..count)
            .map(|_| {
                if total <= 0.0 {
                    return population[self.rng.gen_range(0..population.len())].clone();
                }
                let mut ticket = self.rng.gen::<f64>() * total;
                let mut selected = population.len() - 1;
                for (idx, score) in scores.iter().enumerate() {
                    ticket -= score;
                    if ticket <= 0.0 {
                        selected = idx;
                        break;
                    }
                }
                population[selected].clone()
            })
            .collect()
    }

    /// Pair parents cyclically until the next generation is back to full size
    fn breed(&mut self, parents: &[Individual]) -> Vec<Individual> {
        let size = self.config.population_size.max(2);
        let mut next = Vec::with_capacity(size);
        let mut i = 0;

        while next.len() < size {
            let first = &parents[i % parents.len()];
            let second = &parents[(i + 1) % parents.len()];
            i += 2;

            let (mut a, mut b) = if self.rng.gen::<f64>() < self.config.crossover_rate {
                (self.crossover(first, second), self.crossover(second, first))
            } else {
                (first.clone(), second.clone())
            };

            if self.rng.gen::<f64>() < self.config.mutation_rate {
                self.mutate(&mut a);
            }
            if self.rng.gen::<f64>() < self.config.mutation_rate {
                self.mutate(&mut b);
            }

            next.push(a);
            if next.len() < size {
                next.push(b);
            }
        }

        next
    }

    fn crossover(&mut self, first: &Individual, second: &Individual) -> Individual {
        Individual {
            home_goals: if self.rng.gen_bool(0.5) { first.home_goals } else { second.home_goals },
            away_goals: if self.rng.gen_bool(0.5) { first.away_goals } else { second.away_goals },
            weights: first.weights.blend(&second.weights),
        }
    }

    fn mutate(&mut self, individual: &mut Individual) {
        if self.rng.gen_bool(GOAL_GENE_MUTATION) {
            individual.home_goals = self.rng.gen_range(0..=self.config.max_goals);
        }
        if self.rng.gen_bool(GOAL_GENE_MUTATION) {
            individual.away_goals = self.rng.gen_range(0..=self.config.max_goals);
        }

        let weights = &mut individual.weights;
        for gene in [
            &mut weights.attack,
            &mut weights.defense,
            &mut weights.form,
            &mut weights.home_advantage,
        ] {
            if self.rng.gen_bool(WEIGHT_GENE_MUTATION) {
                *gene = self.rng.gen();
            }
        }
    }
}
