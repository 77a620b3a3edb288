use crate::genomics::Genome;
use crate::{Parameters, RandomSource};

use serde::{Deserialize, Serialize};

/// A cluster of genomes within compatibility-distance reach of a
/// representative.
///
/// The representative is a snapshot of the genome that founded the
/// species, not a live reference into the member list; each new
/// generation's genomes are matched against it, so every member lies
/// within the threshold in effect when it joined.
///
/// A species stagnates by failing to improve its best-ever fitness.
/// Stagnation past `species_max_stagnation` marks it for removal
/// unless it holds the population's best genome or too few species
/// would remain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Species {
    id: usize,
    representative: Genome,
    pub(super) members: Vec<Genome>,
    best_fitness: f64,
    gens_no_improvement: usize,
    age: usize,
}

impl Species {
    pub(super) fn new(id: usize, founder: Genome) -> Species {
        Species {
            id,
            representative: founder.clone(),
            members: vec![founder],
            best_fitness: 0.0,
            gens_no_improvement: 0,
            age: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// The snapshot genome new members are compared against.
    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Returns an iterator over the species' members.
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.members.iter()
    }

    pub(super) fn genomes_mut(&mut self) -> impl Iterator<Item = &mut Genome> {
        self.members.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Age in generations since the species was founded.
    pub fn age(&self) -> usize {
        self.age
    }

    /// Generations since the species last improved its best-ever
    /// fitness.
    pub fn time_stagnated(&self) -> usize {
        self.gens_no_improvement
    }

    /// Best fitness the species has ever reached.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// The best-performing current member.
    ///
    /// # Panics
    /// Panics if the species is empty.
    pub fn champion(&self) -> &Genome {
        self.members
            .iter()
            .max_by(|a, b| {
                a.fitness()
                    .partial_cmp(&b.fitness())
                    .unwrap_or_else(|| panic!("NaN fitness in species {}", self.id))
            })
            .expect("empty species has no champion")
    }

    pub(super) fn add_genome(&mut self, genome: Genome) {
        self.members.push(genome);
    }

    pub(super) fn clear_members(&mut self) {
        self.members.clear();
    }

    pub(super) fn increment_age(&mut self) {
        self.age += 1;
    }

    /// Rolls the stagnation counter: reset on a new best-ever fitness,
    /// incremented otherwise.
    pub(super) fn update_stagnation(&mut self) {
        let current_best = self
            .members
            .iter()
            .map(|g| g.fitness())
            .fold(0.0_f64, f64::max);
        if current_best > self.best_fitness {
            self.best_fitness = current_best;
            self.gens_no_improvement = 0;
        } else {
            self.gens_no_improvement += 1;
        }
    }

    /// Member-count-shared fitness, with the young-age boost and
    /// old-age penalty applied.
    pub(super) fn adjusted_fitness(&self, params: &Parameters) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let mut fitness =
            self.members.iter().map(|g| g.fitness()).sum::<f64>() / self.members.len() as f64;
        if self.age < params.young_age_threshold {
            fitness *= params.young_age_fitness_boost;
        }
        if self.age > params.old_age_threshold {
            fitness *= params.old_age_penalty;
        }
        fitness
    }

    /// Sorts members by descending fitness.
    ///
    /// # Panics
    /// Panics on NaN fitness values.
    pub(super) fn sort_by_fitness(&mut self) {
        self.members.sort_unstable_by(|a, b| {
            b.fitness()
                .partial_cmp(&a.fitness())
                .unwrap_or_else(|| panic!("NaN fitness in species {}", self.id))
        });
    }

    /// Number of members eligible as parents: the top `survival_rate`
    /// fraction, at least one. Assumes members are sorted.
    pub(super) fn survivor_count(&self, params: &Parameters) -> usize {
        ((self.members.len() as f64 * params.survival_rate).ceil() as usize)
            .clamp(1, self.members.len())
    }

    /// Draws a parent index from the top `survivors` members: a
    /// fitness-proportional roulette when configured, a uniform draw
    /// otherwise.
    pub(super) fn select_parent_index(
        &self,
        survivors: usize,
        params: &Parameters,
        rng: &mut RandomSource,
    ) -> usize {
        if params.roulette_wheel_selection {
            let weights: Vec<f64> = self.members[..survivors]
                .iter()
                .map(|g| g.fitness().max(0.0))
                .collect();
            rng.roulette(&weights)
        } else {
            rng.rand_int(0, survivors - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ActivationFunction;

    fn genome_with_fitness(id: usize, fitness: f64) -> Genome {
        let params = Parameters::defaults();
        let mut rng = RandomSource::seeded(id as u64);
        let mut genome = Genome::new(
            id,
            2,
            1,
            ActivationFunction::UnsignedSigmoid,
            &params,
            &mut rng,
        );
        genome.set_fitness(fitness);
        genome.set_evaluated();
        genome
    }

    #[test]
    fn stagnation_resets_on_improvement() {
        let mut species = Species::new(0, genome_with_fitness(0, 1.0));
        species.update_stagnation();
        assert_eq!(species.time_stagnated(), 0);
        assert_eq!(species.best_fitness(), 1.0);

        // No improvement.
        species.update_stagnation();
        species.update_stagnation();
        assert_eq!(species.time_stagnated(), 2);

        species.add_genome(genome_with_fitness(1, 3.0));
        species.update_stagnation();
        assert_eq!(species.time_stagnated(), 0);
        assert_eq!(species.best_fitness(), 3.0);
    }

    #[test]
    fn adjusted_fitness_is_member_shared() {
        let params = Parameters {
            young_age_threshold: 0,
            old_age_threshold: 1000,
            ..Parameters::defaults()
        };
        let mut species = Species::new(0, genome_with_fitness(0, 2.0));
        species.add_genome(genome_with_fitness(1, 4.0));
        species.add_genome(genome_with_fitness(2, 6.0));
        assert!((species.adjusted_fitness(&params) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn young_boost_and_old_penalty() {
        let params = Parameters {
            young_age_threshold: 5,
            young_age_fitness_boost: 2.0,
            old_age_threshold: 10,
            old_age_penalty: 0.5,
            ..Parameters::defaults()
        };
        let mut species = Species::new(0, genome_with_fitness(0, 1.0));
        assert!((species.adjusted_fitness(&params) - 2.0).abs() < 1e-12);
        for _ in 0..=10 {
            species.increment_age();
        }
        assert!((species.adjusted_fitness(&params) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn champion_is_the_fittest_member() {
        let mut species = Species::new(0, genome_with_fitness(0, 5.0));
        species.add_genome(genome_with_fitness(1, 20.0));
        species.add_genome(genome_with_fitness(2, 10.0));
        assert_eq!(species.champion().id(), 1);
    }

    #[test]
    fn survivor_count_never_zero() {
        let params = Parameters {
            survival_rate: 0.2,
            ..Parameters::defaults()
        };
        let mut species = Species::new(0, genome_with_fitness(0, 1.0));
        assert_eq!(species.survivor_count(&params), 1);
        for i in 1..10 {
            species.add_genome(genome_with_fitness(i, 1.0));
        }
        assert_eq!(species.survivor_count(&params), 2);
    }
}
