//! An implementation of NeuroEvolution of Augmenting Topologies (NEAT),
//! with indirect HyperNEAT encoding over geometric substrates.
//!
//! The engine evolves [`Genome`]s, collections of neuron and link
//! genes tracked by a population-wide innovation ledger, clustered
//! into species by compatibility distance. Each generation, an
//! external evaluator assigns fitness to every genome, after which
//! [`Population::epoch`] speciates, shares fitness, selects parents,
//! and produces the next generation by crossover and mutation. A
//! genome instantiates as an executable [`NeuralNetwork`] either
//! directly (one neuron per gene) or, in HyperNEAT mode, as a pattern
//! of weights queried over a [`Substrate`]'s coordinates.
//!
//! Evolution is deterministic: a fixed seed, fixed [`Parameters`] and
//! fixed fitness assignments reproduce a run exactly, and a serialized
//! [`Population`] resumes identically.
//!
//! [`Genome`]: crate::genomics::Genome
//! [`NeuralNetwork`]: crate::networks::NeuralNetwork
//! [`Substrate`]: crate::substrate::Substrate
//! [`Population`]: crate::populations::Population
//! [`Population::epoch`]: crate::populations::Population::epoch
//!
//! # Example: evolving a XOR approximator
//! ```
//! use polyneat::{Parameters, RandomSource};
//! use polyneat::genomics::{ActivationFunction, Genome};
//! use polyneat::populations::Population;
//!
//! fn evaluate(genome: &Genome) -> f64 {
//!     let mut network = genome.build_phenotype();
//!     let cases = [
//!         ([0.0, 0.0, 1.0], 0.0),
//!         ([0.0, 1.0, 1.0], 1.0),
//!         ([1.0, 0.0, 1.0], 1.0),
//!         ([1.0, 1.0, 1.0], 0.0),
//!     ];
//!     let mut error = 0.0;
//!     for (input, expected) in cases {
//!         network.flush();
//!         network.load_inputs(&input);
//!         for _ in 0..3 {
//!             network.activate();
//!         }
//!         error += (network.outputs()[0] - expected).abs();
//!     }
//!     (4.0 - error).powi(2)
//! }
//!
//! let params = Parameters {
//!     population_size: 150,
//!     compat_threshold: 2.0,
//!     min_species: 2,
//!     max_species: 8,
//!     mutate_add_link_prob: 0.3,
//!     mutate_add_neuron_prob: 0.01,
//!     recurrent_prob: 0.0,
//!     allow_loops: false,
//!     min_activation_a: 4.9,
//!     max_activation_a: 4.9,
//!     ..Parameters::defaults()
//! };
//!
//! // 2 inputs + the bias input, 1 output.
//! let mut rng = RandomSource::seeded(1);
//! let seed = Genome::new(0, 3, 1, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
//! let mut population = Population::new(seed, params, 1).unwrap();
//!
//! for _ in 0..10 {
//!     population.evaluate_with(evaluate);
//!     if population.champion().fitness() > 15.0 {
//!         break;
//!     }
//!     population.epoch().unwrap();
//! }
//! ```

pub mod genomics;
pub mod networks;
pub mod populations;
pub mod substrate;

mod parameters;
mod rng;

pub use parameters::{Parameters, ParametersError};
pub use rng::RandomSource;

/// Identifier assigned to historically identical structural mutations,
/// used to align genes between genomes.
pub type Innovation = usize;

/// Identifier of a neuron gene, unique within a genome and stable
/// across the genomes that inherit it.
pub type NeuronId = usize;
