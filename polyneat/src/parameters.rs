//! Run-wide configuration.
//!
//! A [`Parameters`] value is assembled once, validated when the
//! `Population` is constructed, and treated as immutable for the rest
//! of the run. User code may adjust knobs between generations, but the
//! engine itself never writes to it.

use crate::genomics::traits::TraitParameters;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// The full set of evolution knobs.
///
/// All `*_prob` and `*_rate` fields are probabilities in `[0, 1]`.
/// Start from [`Parameters::defaults`] and override what the experiment
/// needs:
///
/// ```
/// use polyneat::Parameters;
///
/// let params = Parameters {
///     population_size: 150,
///     compat_threshold: 2.0,
///     mutate_add_link_prob: 0.3,
///     mutate_add_neuron_prob: 0.001,
///     ..Parameters::defaults()
/// };
/// assert!(params.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    // -- Population sizing and speciation --
    /// Number of genomes per generation.
    pub population_size: usize,
    /// Lower bound the dynamic threshold steers the species count toward.
    /// Also the floor below which stagnation removal stops.
    pub min_species: usize,
    /// Upper bound the dynamic threshold steers the species count toward.
    pub max_species: usize,
    /// Nudge `compat_threshold` each generation to keep the species
    /// count inside `[min_species, max_species]`.
    pub dynamic_compatibility: bool,
    /// Compatibility distance below which a genome joins a species.
    pub compat_threshold: f64,
    /// Step applied to `compat_threshold` per generation when dynamic
    /// compatibility is on.
    pub compat_threshold_modifier: f64,
    /// Hard floor for the dynamic threshold.
    pub min_compat_threshold: f64,
    /// Divide the excess/disjoint distance terms by the larger genome's
    /// gene count instead of 1.
    pub normalize_genome_size: bool,
    /// Weight of excess genes in compatibility distance.
    pub excess_coeff: f64,
    /// Weight of disjoint genes in compatibility distance.
    pub disjoint_coeff: f64,
    /// Weight of the average matching-gene weight difference.
    pub weight_diff_coeff: f64,

    // -- Species lifecycle --
    /// Age below which a species' adjusted fitness is boosted.
    pub young_age_threshold: usize,
    /// Multiplier applied to young species (≥ 1 boosts).
    pub young_age_fitness_boost: f64,
    /// Age above which a species' adjusted fitness is penalized.
    pub old_age_threshold: usize,
    /// Multiplier applied to old species (≤ 1 penalizes).
    pub old_age_penalty: f64,
    /// Generations without improvement before a species is removed
    /// (the species holding the population best is exempt, as is any
    /// removal that would drop the species count below `min_species`).
    pub species_max_stagnation: usize,
    /// Fraction of each species eligible as parents.
    pub survival_rate: f64,
    /// Copy each species' champion into the next generation unchanged.
    pub elitism: bool,

    // -- Reproduction --
    /// Chance an offspring comes from two parents rather than a clone.
    pub crossover_rate: f64,
    /// Chance a mating averages matching-gene weights instead of
    /// picking each from a random parent.
    pub multipoint_crossover_rate: f64,
    /// On a fitness tie, chance each parent's unmatched gene is
    /// inherited.
    pub tie_inherit_rate: f64,
    /// Chance a matching gene disabled in either parent stays disabled
    /// in the child.
    pub inherit_disabled_rate: f64,
    /// Chance a crossover offspring is additionally mutated
    /// (clones always mutate).
    pub overall_mutation_rate: f64,
    /// Select parents by fitness-proportional roulette over the
    /// survivors instead of uniformly.
    pub roulette_wheel_selection: bool,

    // -- Weight mutation --
    /// Chance the weight-mutation operator runs on an offspring.
    pub mutate_weights_prob: f64,
    /// Per-link chance of a Gaussian perturbation.
    pub weight_mutation_rate: f64,
    /// Magnitude scale of weight perturbations.
    pub weight_mutation_max_power: f64,
    /// Per-link chance of full weight replacement (when not perturbed).
    pub weight_replacement_rate: f64,
    /// Magnitude bound of replacement draws.
    pub weight_replacement_max_power: f64,
    /// Chance a weight-mutation pass runs in severe mode.
    pub mutate_weights_severe_prob: f64,
    /// Perturbation power multiplier in severe mode.
    pub severe_mutation_power_boost: f64,
    /// Hard bound on link weights; every mutation clamps into
    /// `[-max_weight, max_weight]`.
    pub max_weight: f64,

    // -- Structural mutation --
    /// Chance of an add-neuron (link split) mutation per offspring.
    pub mutate_add_neuron_prob: f64,
    /// Chance of an add-link mutation per offspring.
    pub mutate_add_link_prob: f64,
    /// Chance of a remove-link mutation per offspring.
    pub mutate_rem_link_prob: f64,
    /// Chance an add-link attempt looks for a recurrent link.
    pub recurrent_prob: f64,
    /// Chance an add-link attempt looks for a self-loop
    /// (only meaningful with `allow_loops`).
    pub recurrent_loop_prob: f64,
    /// Permit loop-forming links. When false, candidate loops are
    /// rejected at mutation time.
    pub allow_loops: bool,
    /// Attempts an add-link mutation makes before giving up silently.
    pub link_tries: usize,

    // -- Activation functions --
    /// Selection weight of each activation function when a new neuron
    /// picks its tag, in [`ActivationFunction::ALL`] order.
    ///
    /// [`ActivationFunction::ALL`]: crate::genomics::ActivationFunction::ALL
    pub activation_signed_sigmoid_prob: f64,
    pub activation_unsigned_sigmoid_prob: f64,
    pub activation_tanh_prob: f64,
    pub activation_tanh_cubic_prob: f64,
    pub activation_signed_step_prob: f64,
    pub activation_unsigned_step_prob: f64,
    pub activation_signed_gauss_prob: f64,
    pub activation_unsigned_gauss_prob: f64,
    pub activation_abs_prob: f64,
    pub activation_signed_sine_prob: f64,
    pub activation_unsigned_sine_prob: f64,
    pub activation_linear_prob: f64,
    pub activation_relu_prob: f64,
    pub activation_softplus_prob: f64,
    /// Chance a neuron's activation tag is redrawn.
    pub mutate_neuron_activation_type_prob: f64,
    /// Chance the slope parameter `a` of a random neuron is perturbed.
    pub mutate_activation_a_prob: f64,
    /// Chance the shift parameter `b` of a random neuron is perturbed.
    pub mutate_activation_b_prob: f64,
    /// Magnitude scale of `a` perturbations.
    pub activation_a_mutation_max_power: f64,
    /// Magnitude scale of `b` perturbations.
    pub activation_b_mutation_max_power: f64,
    pub min_activation_a: f64,
    pub max_activation_a: f64,
    pub min_activation_b: f64,
    pub max_activation_b: f64,
    /// Chance a random neuron's time constant is perturbed.
    pub mutate_neuron_time_constants_prob: f64,
    /// Magnitude scale of time-constant perturbations.
    pub time_constant_mutation_max_power: f64,
    pub min_neuron_time_constant: f64,
    pub max_neuron_time_constant: f64,
    /// Chance a random neuron's leaky bias is perturbed.
    pub mutate_neuron_bias_prob: f64,
    /// Magnitude scale of bias perturbations.
    pub bias_mutation_max_power: f64,
    pub min_neuron_bias: f64,
    pub max_neuron_bias: f64,

    // -- Traits --
    /// Chance a random neuron's trait map mutates.
    pub mutate_neuron_traits_prob: f64,
    /// Chance a random link's trait map mutates.
    pub mutate_link_traits_prob: f64,
    /// Chance the genome-level trait map mutates.
    pub mutate_genome_traits_prob: f64,
    /// Trait specs applied to every neuron gene.
    pub neuron_trait_specs: BTreeMap<String, TraitParameters>,
    /// Trait specs applied to every link gene.
    pub link_trait_specs: BTreeMap<String, TraitParameters>,
    /// Trait specs applied to the genome itself.
    pub genome_trait_specs: BTreeMap<String, TraitParameters>,
}

impl Parameters {
    /// Returns a complete, conservative configuration, suitable as the
    /// base for struct-update overrides.
    pub fn defaults() -> Parameters {
        Parameters {
            population_size: 150,
            min_species: 5,
            max_species: 10,
            dynamic_compatibility: true,
            compat_threshold: 5.0,
            compat_threshold_modifier: 0.3,
            min_compat_threshold: 0.2,
            normalize_genome_size: false,
            excess_coeff: 1.0,
            disjoint_coeff: 1.0,
            weight_diff_coeff: 0.5,

            young_age_threshold: 5,
            young_age_fitness_boost: 1.1,
            old_age_threshold: 30,
            old_age_penalty: 0.5,
            species_max_stagnation: 50,
            survival_rate: 0.25,
            elitism: true,

            crossover_rate: 0.7,
            multipoint_crossover_rate: 0.75,
            tie_inherit_rate: 0.5,
            inherit_disabled_rate: 0.75,
            overall_mutation_rate: 0.25,
            roulette_wheel_selection: false,

            mutate_weights_prob: 0.9,
            weight_mutation_rate: 1.0,
            weight_mutation_max_power: 1.0,
            weight_replacement_rate: 0.2,
            weight_replacement_max_power: 1.0,
            mutate_weights_severe_prob: 0.25,
            severe_mutation_power_boost: 5.0,
            max_weight: 8.0,

            mutate_add_neuron_prob: 0.01,
            mutate_add_link_prob: 0.08,
            mutate_rem_link_prob: 0.0,
            recurrent_prob: 0.25,
            recurrent_loop_prob: 0.25,
            allow_loops: true,
            link_tries: 32,

            activation_signed_sigmoid_prob: 0.0,
            activation_unsigned_sigmoid_prob: 1.0,
            activation_tanh_prob: 0.0,
            activation_tanh_cubic_prob: 0.0,
            activation_signed_step_prob: 0.0,
            activation_unsigned_step_prob: 0.0,
            activation_signed_gauss_prob: 0.0,
            activation_unsigned_gauss_prob: 0.0,
            activation_abs_prob: 0.0,
            activation_signed_sine_prob: 0.0,
            activation_unsigned_sine_prob: 0.0,
            activation_linear_prob: 0.0,
            activation_relu_prob: 0.0,
            activation_softplus_prob: 0.0,
            mutate_neuron_activation_type_prob: 0.0,
            mutate_activation_a_prob: 0.0,
            mutate_activation_b_prob: 0.0,
            activation_a_mutation_max_power: 0.0,
            activation_b_mutation_max_power: 0.0,
            min_activation_a: 1.0,
            max_activation_a: 1.0,
            min_activation_b: 0.0,
            max_activation_b: 0.0,
            mutate_neuron_time_constants_prob: 0.0,
            time_constant_mutation_max_power: 0.1,
            min_neuron_time_constant: 1.0,
            max_neuron_time_constant: 1.0,
            mutate_neuron_bias_prob: 0.0,
            bias_mutation_max_power: 0.1,
            min_neuron_bias: 0.0,
            max_neuron_bias: 0.0,

            mutate_neuron_traits_prob: 1.0,
            mutate_link_traits_prob: 1.0,
            mutate_genome_traits_prob: 1.0,
            neuron_trait_specs: BTreeMap::new(),
            link_trait_specs: BTreeMap::new(),
            genome_trait_specs: BTreeMap::new(),
        }
    }

    /// The per-function selection weights, in
    /// [`ActivationFunction::ALL`] order.
    ///
    /// [`ActivationFunction::ALL`]: crate::genomics::ActivationFunction::ALL
    pub fn activation_function_probs(&self) -> [f64; 14] {
        [
            self.activation_signed_sigmoid_prob,
            self.activation_unsigned_sigmoid_prob,
            self.activation_tanh_prob,
            self.activation_tanh_cubic_prob,
            self.activation_signed_step_prob,
            self.activation_unsigned_step_prob,
            self.activation_signed_gauss_prob,
            self.activation_unsigned_gauss_prob,
            self.activation_abs_prob,
            self.activation_signed_sine_prob,
            self.activation_unsigned_sine_prob,
            self.activation_linear_prob,
            self.activation_relu_prob,
            self.activation_softplus_prob,
        ]
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    /// Returns the first problem found. Called by `Population::new`;
    /// a failed validation is fatal to that construction attempt.
    pub fn validate(&self) -> Result<(), ParametersError> {
        use ParametersError::*;

        if self.population_size == 0 {
            return Err(NonPositive("population_size", 0.0));
        }
        if self.min_species > self.max_species {
            return Err(InvalidSpeciesRange {
                min: self.min_species,
                max: self.max_species,
            });
        }
        if self.min_species == 0 {
            return Err(NonPositive("min_species", 0.0));
        }
        if !(self.survival_rate > 0.0 && self.survival_rate <= 1.0) {
            return Err(OutOfRange("survival_rate", self.survival_rate));
        }
        if self.max_weight <= 0.0 {
            return Err(NonPositive("max_weight", self.max_weight));
        }
        if self.compat_threshold <= 0.0 {
            return Err(NonPositive("compat_threshold", self.compat_threshold));
        }
        if self.link_tries == 0 {
            return Err(NonPositive("link_tries", 0.0));
        }
        if self.species_max_stagnation == 0 {
            return Err(NonPositive("species_max_stagnation", 0.0));
        }

        for (name, value) in [
            ("crossover_rate", self.crossover_rate),
            ("multipoint_crossover_rate", self.multipoint_crossover_rate),
            ("tie_inherit_rate", self.tie_inherit_rate),
            ("inherit_disabled_rate", self.inherit_disabled_rate),
            ("overall_mutation_rate", self.overall_mutation_rate),
            ("mutate_weights_prob", self.mutate_weights_prob),
            ("weight_mutation_rate", self.weight_mutation_rate),
            ("weight_replacement_rate", self.weight_replacement_rate),
            ("mutate_weights_severe_prob", self.mutate_weights_severe_prob),
            ("mutate_add_neuron_prob", self.mutate_add_neuron_prob),
            ("mutate_add_link_prob", self.mutate_add_link_prob),
            ("mutate_rem_link_prob", self.mutate_rem_link_prob),
            ("recurrent_prob", self.recurrent_prob),
            ("recurrent_loop_prob", self.recurrent_loop_prob),
            (
                "mutate_neuron_activation_type_prob",
                self.mutate_neuron_activation_type_prob,
            ),
            ("mutate_activation_a_prob", self.mutate_activation_a_prob),
            ("mutate_activation_b_prob", self.mutate_activation_b_prob),
            (
                "mutate_neuron_time_constants_prob",
                self.mutate_neuron_time_constants_prob,
            ),
            ("mutate_neuron_bias_prob", self.mutate_neuron_bias_prob),
            ("mutate_neuron_traits_prob", self.mutate_neuron_traits_prob),
            ("mutate_link_traits_prob", self.mutate_link_traits_prob),
            ("mutate_genome_traits_prob", self.mutate_genome_traits_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OutOfRange(name, value));
            }
        }

        for (name, min, max) in [
            ("activation_a", self.min_activation_a, self.max_activation_a),
            ("activation_b", self.min_activation_b, self.max_activation_b),
            (
                "neuron_time_constant",
                self.min_neuron_time_constant,
                self.max_neuron_time_constant,
            ),
            ("neuron_bias", self.min_neuron_bias, self.max_neuron_bias),
        ] {
            if min > max {
                return Err(InvalidBounds { name, min, max });
            }
        }

        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters::defaults()
    }
}

/// A contradiction in a [`Parameters`] value, detected at population
/// construction and fatal to that construction attempt.
#[derive(Debug, PartialEq)]
pub enum ParametersError {
    /// `min_species` exceeds `max_species`.
    InvalidSpeciesRange { min: usize, max: usize },
    /// A probability or rate lies outside its valid range.
    OutOfRange(&'static str, f64),
    /// A quantity that must be positive is zero or negative.
    NonPositive(&'static str, f64),
    /// A min/max pair is inverted.
    InvalidBounds {
        name: &'static str,
        min: f64,
        max: f64,
    },
}

impl fmt::Display for ParametersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpeciesRange { min, max } => {
                write!(f, "min_species ({}) exceeds max_species ({})", min, max)
            }
            Self::OutOfRange(name, value) => {
                write!(f, "{} = {} is outside [0, 1]", name, value)
            }
            Self::NonPositive(name, value) => {
                write!(f, "{} = {} must be positive", name, value)
            }
            Self::InvalidBounds { name, min, max } => {
                write!(f, "min_{0} ({1}) exceeds max_{0} ({2})", name, min, max)
            }
        }
    }
}

impl Error for ParametersError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Parameters::defaults().validate().is_ok());
    }

    #[test]
    fn species_range_checked() {
        let params = Parameters {
            min_species: 10,
            max_species: 5,
            ..Parameters::defaults()
        };
        assert_eq!(
            params.validate(),
            Err(ParametersError::InvalidSpeciesRange { min: 10, max: 5 })
        );
    }

    #[test]
    fn negative_rate_rejected() {
        let params = Parameters {
            crossover_rate: -0.1,
            ..Parameters::defaults()
        };
        assert!(matches!(
            params.validate(),
            Err(ParametersError::OutOfRange("crossover_rate", _))
        ));
    }

    #[test]
    fn zero_population_rejected() {
        let params = Parameters {
            population_size: 0,
            ..Parameters::defaults()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn inverted_bounds_rejected() {
        let params = Parameters {
            min_activation_a: 3.0,
            max_activation_a: 1.0,
            ..Parameters::defaults()
        };
        assert!(matches!(
            params.validate(),
            Err(ParametersError::InvalidBounds { name: "activation_a", .. })
        ));
    }
}
