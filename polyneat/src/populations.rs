//! A population drives the generational loop.
//!
//! It owns the species, the innovation database and the random source,
//! and advances one full generational step per [`epoch`] call:
//! stagnation bookkeeping, adjusted-fitness sharing, offspring
//! apportionment, reproduction, and re-speciation. Fitness evaluation
//! itself stays outside the engine: the caller assigns a fitness to
//! every genome between epochs.
//!
//! [`epoch`]: Population::epoch

mod errors;
pub mod logging;
mod species;

pub use errors::EpochError;
pub use logging::{EvolutionLogger, GenerationMembers, Log, ReportingLevel, Stats};
pub use species::Species;

use crate::genomics::{Genome, InnovationDatabase};
use crate::{Parameters, ParametersError, RandomSource};

use serde::{Deserialize, Serialize};

/// A speciated population of genomes.
///
/// Construction validates the [`Parameters`]; evolution is then
/// deterministic given the seed, the parameters, and the fitness
/// values assigned between epochs. Serializing the population captures
/// everything needed to resume identically: genomes, species state,
/// the innovation ledger, the RNG position and the generation counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Population {
    params: Parameters,
    species: Vec<Species>,
    innovations: InnovationDatabase,
    rng: RandomSource,
    generation: usize,
    next_genome_id: usize,
    next_species_id: usize,
    compat_threshold: f64,
    best_genome: Genome,
    best_fitness_ever: f64,
}

impl Population {
    /// Creates a population of `population_size` clones of `prototype`
    /// with re-randomized weights, speciated from scratch.
    ///
    /// The prototype should be a freshly constructed seed genome
    /// ([`Genome::new`] or [`Genome::unconnected`]); the innovation
    /// database is pre-seeded with exactly that structure's numbering.
    ///
    /// # Errors
    /// Fails when `params` is contradictory; nothing is constructed in
    /// that case.
    ///
    /// # Examples
    /// ```
    /// use polyneat::{Parameters, RandomSource};
    /// use polyneat::genomics::{ActivationFunction, Genome};
    /// use polyneat::populations::Population;
    ///
    /// let params = Parameters { population_size: 50, ..Parameters::defaults() };
    /// let mut rng = RandomSource::seeded(0);
    /// let seed = Genome::new(0, 3, 1, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
    ///
    /// let population = Population::new(seed, params, 42).unwrap();
    /// assert_eq!(population.genomes().count(), 50);
    /// ```
    pub fn new(
        prototype: Genome,
        params: Parameters,
        seed: u64,
    ) -> Result<Population, ParametersError> {
        params.validate()?;
        let rng = RandomSource::seeded(seed);
        let innovations =
            InnovationDatabase::new(prototype.input_count(), prototype.output_count());
        let compat_threshold = params.compat_threshold;
        let mut population = Population {
            params,
            species: Vec::new(),
            innovations,
            rng,
            generation: 0,
            next_genome_id: 0,
            next_species_id: 0,
            compat_threshold,
            best_genome: prototype.clone(),
            best_fitness_ever: 0.0,
        };
        for _ in 0..population.params.population_size {
            let mut genome = prototype.clone();
            genome.set_id(population.next_genome_id);
            population.next_genome_id += 1;
            genome.randomize_weights(&population.params, &mut population.rng);
            population.speciate(genome);
        }
        Ok(population)
    }

    /// Assigns fitness to every genome with the passed evaluator and
    /// marks them evaluated. Convenience wrapper over the external
    /// evaluation contract; a parallel harness can instead walk
    /// [`genomes_mut`] itself.
    ///
    /// [`genomes_mut`]: Population::genomes_mut
    ///
    /// # Panics
    /// Panics if the evaluator returns a negative fitness.
    pub fn evaluate_with<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&Genome) -> f64,
    {
        for species in &mut self.species {
            for genome in species.genomes_mut() {
                let fitness = evaluator(genome);
                genome.set_fitness(fitness);
                genome.set_evaluated();
            }
        }
    }

    /// Advances one generation: updates stagnation, shares fitness,
    /// apportions offspring per species, reproduces (elitism,
    /// crossover, mutation), and re-speciates the new generation
    /// against representatives carried from the previous one.
    ///
    /// Deterministic given a fixed seed, fixed parameters and fixed
    /// fitness assignments.
    ///
    /// # Errors
    /// Fails when a genome entered unevaluated (before anything is
    /// modified), or when total adjusted fitness is zero (no new
    /// generation is produced).
    pub fn epoch(&mut self) -> Result<(), EpochError> {
        for species in &self.species {
            for genome in species.genomes() {
                if !genome.is_evaluated() {
                    return Err(EpochError::UnevaluatedGenome {
                        genome: genome.id(),
                        species: species.id(),
                    });
                }
            }
        }

        // Best-ever bookkeeping first, so stagnation removal can spare
        // the species holding the current champion.
        let champion_fitness = self
            .species
            .iter()
            .flat_map(|s| s.genomes())
            .map(|g| g.fitness())
            .fold(0.0_f64, f64::max);
        if champion_fitness > self.best_fitness_ever {
            self.best_fitness_ever = champion_fitness;
            self.best_genome = self.champion().clone();
        }

        for species in &mut self.species {
            species.update_stagnation();
            species.increment_age();
        }

        let mut marked = vec![false; self.species.len()];
        let mut alive = self.species.len();
        for (index, species) in self.species.iter().enumerate() {
            let holds_champion =
                (species.champion().fitness() - champion_fitness).abs() < f64::EPSILON;
            if species.time_stagnated() > self.params.species_max_stagnation
                && !holds_champion
                && alive > self.params.min_species
            {
                marked[index] = true;
                alive -= 1;
            }
        }

        let adjusted: Vec<f64> = self
            .species
            .iter()
            .zip(&marked)
            .map(|(species, removed)| {
                if *removed {
                    0.0
                } else {
                    species.adjusted_fitness(&self.params)
                }
            })
            .collect();
        let total: f64 = adjusted.iter().sum();
        if total <= 0.0 {
            return Err(EpochError::DegeneratePopulation);
        }
        let shares: Vec<f64> = adjusted
            .iter()
            .map(|f| f / total * self.params.population_size as f64)
            .collect();
        let allotted = round_retain_sum(&shares);

        let next_generation = self.generation + 1;
        let mut offspring: Vec<Genome> = Vec::with_capacity(self.params.population_size);
        for (index, species) in self.species.iter_mut().enumerate() {
            let mut slots = allotted[index];
            if slots == 0 {
                continue;
            }
            species.sort_by_fitness();

            if self.params.elitism {
                let mut elite = species.members[0].clone();
                elite.set_id(self.next_genome_id);
                self.next_genome_id += 1;
                elite.set_birth_generation(next_generation);
                elite.clear_evaluation();
                offspring.push(elite);
                slots -= 1;
            }

            let survivors = species.survivor_count(&self.params);
            for _ in 0..slots {
                let mut child = if survivors >= 2 && self.rng.coin(self.params.crossover_rate)
                {
                    let first =
                        species.select_parent_index(survivors, &self.params, &mut self.rng);
                    let mut second =
                        species.select_parent_index(survivors, &self.params, &mut self.rng);
                    let mut retries = 0;
                    while second == first && retries < 4 {
                        second =
                            species.select_parent_index(survivors, &self.params, &mut self.rng);
                        retries += 1;
                    }
                    if second == first {
                        second = (first + 1) % survivors;
                    }
                    let mut child = Genome::mate(
                        &species.members[first],
                        &species.members[second],
                        &self.params,
                        &mut self.rng,
                    );
                    if self.rng.coin(self.params.overall_mutation_rate) {
                        child.mutate(&mut self.innovations, &self.params, &mut self.rng);
                    }
                    child
                } else {
                    // Clones always mutate; an unmutated clone would be
                    // a wasted slot.
                    let parent =
                        species.select_parent_index(survivors, &self.params, &mut self.rng);
                    let mut child = species.members[parent].clone();
                    child.mutate(&mut self.innovations, &self.params, &mut self.rng);
                    child
                };
                child.set_id(self.next_genome_id);
                self.next_genome_id += 1;
                child.set_birth_generation(next_generation);
                child.reset_fitness();
                offspring.push(child);
            }
        }

        // Re-speciate the new generation against the previous
        // generation's representatives. Stagnation-marked species are
        // dropped outright; surviving species keep their identity and
        // counters but start empty.
        let mut survivors: Vec<Species> = Vec::with_capacity(alive);
        for (index, mut species) in self.species.drain(..).enumerate() {
            if !marked[index] {
                species.clear_members();
                survivors.push(species);
            }
        }
        self.species = survivors;
        for child in offspring {
            self.speciate(child);
        }
        self.species.retain(|s| !s.is_empty());

        if self.params.dynamic_compatibility {
            if self.species.len() > self.params.max_species {
                self.compat_threshold += self.params.compat_threshold_modifier;
            } else if self.species.len() < self.params.min_species {
                self.compat_threshold = (self.compat_threshold
                    - self.params.compat_threshold_modifier)
                    .max(self.params.min_compat_threshold);
            }
        }

        self.generation = next_generation;
        Ok(())
    }

    /// Assigns a genome to the first species whose representative lies
    /// within the current compatibility threshold, founding a new
    /// species otherwise.
    fn speciate(&mut self, genome: Genome) {
        for species in &mut self.species {
            if Genome::compatibility_distance(&genome, species.representative(), &self.params)
                < self.compat_threshold
            {
                species.add_genome(genome);
                return;
            }
        }
        let id = self.next_species_id;
        self.next_species_id += 1;
        self.species.push(Species::new(id, genome));
    }

    /// The best-performing genome of the current generation.
    ///
    /// # Panics
    /// Panics on an empty population or NaN fitness values.
    pub fn champion(&self) -> &Genome {
        self.species
            .iter()
            .flat_map(|s| s.genomes())
            .max_by(|a, b| {
                a.fitness()
                    .partial_cmp(&b.fitness())
                    .unwrap_or_else(|| panic!("NaN fitness in population"))
            })
            .expect("empty population has no champion")
    }

    /// The best genome ever seen, retained independently of species
    /// survival.
    pub fn best_genome(&self) -> &Genome {
        &self.best_genome
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns an iterator over all current genomes.
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.species.iter().flat_map(|s| s.genomes())
    }

    /// Returns a mutable iterator over all current genomes, for
    /// external evaluation harnesses writing fitness back.
    pub fn genomes_mut(&mut self) -> impl Iterator<Item = &mut Genome> {
        self.species.iter_mut().flat_map(|s| s.genomes_mut())
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The population's innovation ledger.
    pub fn innovations(&self) -> &InnovationDatabase {
        &self.innovations
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The compatibility threshold currently in effect (moves when
    /// dynamic compatibility is enabled).
    pub fn compat_threshold(&self) -> f64 {
        self.compat_threshold
    }

    /// Restarts the random stream. Reseeding mid-run forfeits
    /// reproducibility of the run up to this point.
    pub fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }
}

/// Rounds non-negative shares to whole counts while preserving their
/// (whole) sum: every share is floored, then the remaining slots go to
/// the largest fractional remainders. This is the offspring
/// apportionment rule; it minimizes the mean rounding error and the
/// counts always sum to the target exactly.
fn round_retain_sum(values: &[f64]) -> Vec<usize> {
    let total: usize = values.iter().sum::<f64>().round() as usize;
    let mut floored: Vec<(usize, usize, f64)> = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let floor = value.floor();
            (index, floor as usize, value - floor)
        })
        .collect();
    let floor_sum: usize = floored.iter().map(|(_, floor, _)| *floor).sum();
    let remainder = total - floor_sum;
    // Decreasing fractional error; index as the deterministic tie-break.
    floored.sort_unstable_by(|a, b| b.2.partial_cmp(&a.2).unwrap().then(a.0.cmp(&b.0)));
    for (_, floor, _) in floored.iter_mut().take(remainder) {
        *floor += 1;
    }
    floored.sort_unstable_by_key(|(index, ..)| *index);
    floored.into_iter().map(|(_, floor, _)| floor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ActivationFunction;

    fn xor_fitness(genome: &Genome) -> f64 {
        let mut network = genome.build_phenotype();
        let cases = [
            ([0.0, 0.0, 1.0], 0.0),
            ([0.0, 1.0, 1.0], 1.0),
            ([1.0, 0.0, 1.0], 1.0),
            ([1.0, 1.0, 1.0], 0.0),
        ];
        let mut error = 0.0;
        for (input, expected) in cases {
            network.flush();
            network.load_inputs(&input);
            for _ in 0..3 {
                network.activate();
            }
            error += (network.outputs()[0] - expected).abs();
        }
        (4.0 - error).powi(2)
    }

    fn test_population(seed: u64, size: usize) -> Population {
        let params = Parameters {
            population_size: size,
            compat_threshold: 2.0,
            min_species: 2,
            max_species: 6,
            normalize_genome_size: true,
            weight_diff_coeff: 0.4,
            mutate_add_link_prob: 0.3,
            mutate_add_neuron_prob: 0.05,
            recurrent_prob: 0.0,
            recurrent_loop_prob: 0.0,
            allow_loops: false,
            min_activation_a: 4.9,
            max_activation_a: 4.9,
            ..Parameters::defaults()
        };
        let mut rng = RandomSource::seeded(seed);
        let prototype = Genome::new(
            0,
            3,
            1,
            ActivationFunction::UnsignedSigmoid,
            &params,
            &mut rng,
        );
        Population::new(prototype, params, seed).unwrap()
    }

    fn assert_speciation_coverage(population: &Population) {
        let total: usize = population.species().map(|s| s.len()).sum();
        assert_eq!(total, population.genomes().count());
        for species in population.species() {
            assert!(!species.is_empty());
        }
    }

    #[test]
    fn round_retain_sum_preserves_total() {
        let values = [5.2, 9.5, 2.8, 1.3, 2.2, 2.7, 6.3, 1.0, 1.0];
        let counts = round_retain_sum(&values);
        assert_eq!(
            counts.iter().sum::<usize>(),
            values.iter().sum::<f64>().round() as usize
        );
        assert_eq!(counts, [5, 10, 3, 1, 2, 3, 6, 1, 1]);
    }

    #[test]
    fn invalid_parameters_fail_construction() {
        let params = Parameters {
            min_species: 9,
            max_species: 3,
            ..Parameters::defaults()
        };
        let mut rng = RandomSource::seeded(0);
        let prototype = Genome::new(
            0,
            2,
            1,
            ActivationFunction::UnsignedSigmoid,
            &params,
            &mut rng,
        );
        assert!(Population::new(prototype, params, 0).is_err());
    }

    #[test]
    fn new_population_has_configured_size() {
        let population = test_population(1, 80);
        assert_eq!(population.genomes().count(), 80);
        assert_speciation_coverage(&population);
        // Clones of one prototype speciate together initially.
        assert_eq!(population.species().count(), 1);
    }

    #[test]
    fn epoch_requires_evaluation() {
        let mut population = test_population(2, 30);
        let err = population.epoch().unwrap_err();
        assert!(matches!(err, EpochError::UnevaluatedGenome { .. }));
    }

    #[test]
    fn all_zero_fitness_is_degenerate() {
        let mut population = test_population(3, 30);
        population.evaluate_with(|_| 0.0);
        assert_eq!(population.epoch().unwrap_err(), EpochError::DegeneratePopulation);
    }

    #[test]
    fn epoch_preserves_population_size() {
        let mut population = test_population(4, 60);
        for _ in 0..10 {
            population.evaluate_with(xor_fitness);
            population.epoch().unwrap();
            assert_eq!(population.genomes().count(), 60);
            assert_speciation_coverage(&population);
        }
        assert_eq!(population.generation(), 10);
    }

    #[test]
    fn best_genome_never_regresses() {
        let mut population = test_population(5, 60);
        let mut best = 0.0;
        for _ in 0..10 {
            population.evaluate_with(xor_fitness);
            population.epoch().unwrap();
            let current = population.best_genome().fitness();
            assert!(current >= best);
            best = current;
        }
        assert!(best > 0.0);
    }

    #[test]
    fn identical_seeds_evolve_identically() {
        let mut a = test_population(6, 50);
        let mut b = test_population(6, 50);
        for _ in 0..5 {
            a.evaluate_with(xor_fitness);
            b.evaluate_with(xor_fitness);
            a.epoch().unwrap();
            b.epoch().unwrap();
        }
        assert_eq!(a, b);
    }

    #[test]
    fn checkpoint_round_trip_resumes_identically() {
        let mut population = test_population(7, 40);
        for _ in 0..3 {
            population.evaluate_with(xor_fitness);
            population.epoch().unwrap();
        }

        let serialized = ron::to_string(&population).unwrap();
        let mut restored: Population = ron::from_str(&serialized).unwrap();

        population.evaluate_with(xor_fitness);
        restored.evaluate_with(xor_fitness);
        population.epoch().unwrap();
        restored.epoch().unwrap();
        assert_eq!(population, restored);
    }

    #[test]
    fn speciation_respects_threshold() {
        let mut population = test_population(8, 60);
        for _ in 0..5 {
            population.evaluate_with(xor_fitness);
            // Speciation inside the epoch uses the threshold in effect
            // at entry; the dynamic nudge only applies afterwards.
            let threshold = population.compat_threshold();
            population.epoch().unwrap();
            for species in population.species() {
                for genome in species.genomes() {
                    let distance = Genome::compatibility_distance(
                        genome,
                        species.representative(),
                        population.params(),
                    );
                    // A founding genome is its own representative.
                    assert!(
                        distance < threshold || distance == 0.0,
                        "genome {} is {} from its representative",
                        genome.id(),
                        distance
                    );
                }
            }
        }
    }

    #[test]
    fn dynamic_threshold_stays_above_floor() {
        let mut population = test_population(9, 60);
        for _ in 0..10 {
            population.evaluate_with(xor_fitness);
            population.epoch().unwrap();
            assert!(population.compat_threshold() >= population.params().min_compat_threshold);
        }
    }
}
