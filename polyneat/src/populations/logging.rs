//! Generation-snapshot logging.
//!
//! An [`EvolutionLogger`] records one [`Log`] per generation: fitness
//! and complexity statistics plus, depending on the reporting level, a
//! sample of the genomes themselves. Snapshots clone what they record,
//! so logs stay valid after the population moves on.

use crate::genomics::Genome;
use crate::populations::Population;

use std::fmt;

/// How much of a population each snapshot clones.
#[derive(Clone, Copy, Debug)]
pub enum ReportingLevel {
    /// Every genome of every species.
    AllGenomes,
    /// Each species' champion.
    SpeciesChampions,
    /// Only the population champion.
    PopulationChampion,
    /// Statistics only, no genomes.
    NoGenomes,
}

/// Basic statistics over a sequence of reals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    /// Computes statistics over `data`.
    ///
    /// # Examples
    /// ```
    /// use polyneat::populations::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    ///
    /// # Panics
    /// Panics on an empty sequence or NaN values.
    pub fn from(data: impl Iterator<Item = f64>) -> Stats {
        let mut data: Vec<f64> = data.collect();
        assert!(!data.is_empty(), "no data to compute statistics over");
        data.sort_unstable_by(|a, b| {
            a.partial_cmp(b)
                .unwrap_or_else(|| panic!("NaN in statistics data"))
        });
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: *data.last().unwrap(),
            minimum: data[0],
            mean: data.iter().sum::<f64>() / data.len() as f64,
            median,
        }
    }
}

/// A reporting-level-dependent store of genomes from one generation.
#[derive(Clone, Debug)]
pub enum GenerationMembers {
    /// Species id, members, and stagnation level.
    Species(Vec<(usize, Vec<Genome>, usize)>),
    /// Species id, champion, and stagnation level.
    SpeciesChampions(Vec<(usize, Genome, usize)>),
    /// Only the population champion.
    PopulationChampion(Box<Genome>),
    /// Empty.
    None,
}

/// A snapshot of one generation.
#[derive(Clone, Debug)]
pub struct Log {
    pub generation: usize,
    pub species_count: usize,
    pub members: GenerationMembers,
    /// Raw fitness over all genomes.
    pub fitness: Stats,
    /// Enabled-link counts over all genomes.
    pub complexity: Stats,
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gen {:>4}: {} species, fitness max {:.4} mean {:.4}, complexity mean {:.1}",
            self.generation,
            self.species_count,
            self.fitness.maximum,
            self.fitness.mean,
            self.complexity.mean,
        )
    }
}

/// A log of the evolution of a population over time.
///
/// # Examples
/// ```
/// use polyneat::{Parameters, RandomSource};
/// use polyneat::genomics::{ActivationFunction, Genome};
/// use polyneat::populations::{EvolutionLogger, Population, ReportingLevel};
///
/// let params = Parameters { population_size: 20, ..Parameters::defaults() };
/// let mut rng = RandomSource::seeded(0);
/// let seed = Genome::new(0, 2, 1, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
/// let mut population = Population::new(seed, params, 0).unwrap();
///
/// let mut logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
/// population.evaluate_with(|_| 1.0);
/// logger.log(&population);
///
/// for log in logger.iter() {
///     println!("{}", log);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct EvolutionLogger {
    reporting_level: ReportingLevel,
    logs: Vec<Log>,
}

impl EvolutionLogger {
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger {
        EvolutionLogger {
            reporting_level,
            logs: Vec::new(),
        }
    }

    /// Stores a snapshot of the population.
    pub fn log(&mut self, population: &Population) {
        let fitness = Stats::from(population.genomes().map(|g| g.fitness()));
        let complexity = Stats::from(population.genomes().map(|g| g.complexity().1 as f64));
        self.logs.push(Log {
            generation: population.generation(),
            species_count: population.species().count(),
            members: match self.reporting_level {
                ReportingLevel::AllGenomes => GenerationMembers::Species(
                    population
                        .species()
                        .map(|s| {
                            (
                                s.id(),
                                s.genomes().cloned().collect(),
                                s.time_stagnated(),
                            )
                        })
                        .collect(),
                ),
                ReportingLevel::SpeciesChampions => GenerationMembers::SpeciesChampions(
                    population
                        .species()
                        .map(|s| (s.id(), s.champion().clone(), s.time_stagnated()))
                        .collect(),
                ),
                ReportingLevel::PopulationChampion => {
                    GenerationMembers::PopulationChampion(Box::new(
                        population.champion().clone(),
                    ))
                }
                ReportingLevel::NoGenomes => GenerationMembers::None,
            },
            fitness,
            complexity,
        })
    }

    /// Iterates over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter()
    }
}
