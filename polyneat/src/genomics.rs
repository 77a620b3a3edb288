//! Genomes are the focus of evolution.
//!
//! A genome is a collection of neuron genes and link genes that can be
//! instantiated as a phenotype (a [`NeuralNetwork`]). Genomes are
//! progressively complexified by structural mutation, recombined by
//! innovation-aligned crossover, and clustered into species by
//! compatibility distance.
//!
//! [`NeuralNetwork`]: crate::networks::NeuralNetwork

mod errors;
mod genes;
mod history;
mod nodes;
pub mod traits;

pub use errors::{GeneValidityError, PhenotypeError};
pub use genes::LinkGene;
pub use history::InnovationDatabase;
pub use nodes::{ActivationFunction, NeuronGene, NeuronType};

use crate::genomics::traits::{init_traits, mate_traits, mutate_traits, TraitMap};
use crate::networks::NeuralNetwork;
use crate::substrate::Substrate;
use crate::{Innovation, NeuronId, Parameters, RandomSource};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The genetic encoding of one candidate neural network.
///
/// Neuron ids are unique within a genome, link genes are kept sorted by
/// innovation id, and every link references neurons present in the
/// genome. Disabled links are retained so crossover can still align
/// them historically.
///
/// A genome is owned by exactly one species at a time; parents are
/// deep-cloned when selected for reproduction, never aliased.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    id: usize,
    birth_generation: usize,
    input_count: usize,
    output_count: usize,
    neurons: Vec<NeuronGene>,
    links: Vec<LinkGene>,
    traits: TraitMap,
    fitness: f64,
    evaluated: bool,
}

impl Genome {
    /// Creates a fully connected seed genome: `input_count` input
    /// neurons (the last one typed [`Bias`], conventionally fed a
    /// constant 1.0), `output_count` outputs, and a link from every
    /// input to every output with a small random weight.
    ///
    /// Initial links carry innovation id `o + i × output_count`, the
    /// same numbering a fresh [`InnovationDatabase`] pre-seeds, so all
    /// genomes of a population share ids for the common structure.
    ///
    /// [`Bias`]: NeuronType::Bias
    ///
    /// # Panics
    /// Panics if `input_count` or `output_count` is zero.
    ///
    /// # Examples
    /// ```
    /// use polyneat::{Parameters, RandomSource};
    /// use polyneat::genomics::{ActivationFunction, Genome, NeuronType};
    ///
    /// let params = Parameters::defaults();
    /// let mut rng = RandomSource::seeded(0);
    /// let genome = Genome::new(0, 3, 2, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
    ///
    /// assert_eq!(genome.neurons().count(), 3 + 2);
    /// assert_eq!(genome.links().count(), 3 * 2);
    /// assert_eq!(
    ///     genome.neurons().filter(|n| n.neuron_type() == NeuronType::Bias).count(),
    ///     1,
    /// );
    /// assert!(genome.links().all(|l| l.weight().abs() <= params.max_weight));
    /// ```
    pub fn new(
        id: usize,
        input_count: usize,
        output_count: usize,
        output_activation: ActivationFunction,
        params: &Parameters,
        rng: &mut RandomSource,
    ) -> Genome {
        let mut genome = Self::unconnected(
            id,
            input_count,
            output_count,
            output_activation,
            params,
            rng,
        );
        for i in 0..input_count {
            for o in 0..output_count {
                let weight = (rng.float_signed() * params.weight_replacement_max_power)
                    .clamp(-params.max_weight, params.max_weight);
                let mut gene =
                    LinkGene::new(o + i * output_count, i, o + input_count, weight, false);
                gene.traits = init_traits(&params.link_trait_specs, rng);
                genome.links.push(gene);
            }
        }
        genome.links.sort_unstable_by_key(|l| l.innovation());
        genome
    }

    /// Creates a seed genome with no links at all: inputs and outputs
    /// only. Useful for minimal-start experiments, and as the base for
    /// hand-assembled genomes in tests.
    ///
    /// # Panics
    /// Panics if `input_count` or `output_count` is zero.
    pub fn unconnected(
        id: usize,
        input_count: usize,
        output_count: usize,
        output_activation: ActivationFunction,
        params: &Parameters,
        rng: &mut RandomSource,
    ) -> Genome {
        assert!(
            input_count > 0 && output_count > 0,
            "genome requires at least one input and one output"
        );
        let mut neurons = Vec::with_capacity(input_count + output_count);
        for i in 0..input_count {
            let neuron_type = if i == input_count - 1 && input_count > 1 {
                NeuronType::Bias
            } else {
                NeuronType::Input
            };
            let mut neuron = NeuronGene::new(i, neuron_type, ActivationFunction::Linear, 0.0);
            neuron.traits = init_traits(&params.neuron_trait_specs, rng);
            neurons.push(neuron);
        }
        for o in 0..output_count {
            let mut neuron =
                NeuronGene::new(o + input_count, NeuronType::Output, output_activation, 1.0);
            neuron.init_shape(
                uniform_in(params.min_activation_a, params.max_activation_a, rng),
                uniform_in(params.min_activation_b, params.max_activation_b, rng),
                uniform_in(
                    params.min_neuron_time_constant,
                    params.max_neuron_time_constant,
                    rng,
                ),
                uniform_in(params.min_neuron_bias, params.max_neuron_bias, rng),
            );
            neuron.traits = init_traits(&params.neuron_trait_specs, rng);
            neurons.push(neuron);
        }
        Genome {
            id,
            birth_generation: 0,
            input_count,
            output_count,
            neurons,
            links: Vec::new(),
            traits: init_traits(&params.genome_trait_specs, rng),
            fitness: 0.0,
            evaluated: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// The generation this genome was produced in.
    pub fn birth_generation(&self) -> usize {
        self.birth_generation
    }

    /// Number of input neurons, bias included.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Returns an iterator over the genome's neuron genes.
    /// Inputs come first, then outputs, then hidden neurons.
    pub fn neurons(&self) -> impl Iterator<Item = &NeuronGene> {
        self.neurons.iter()
    }

    /// Returns an iterator over the genome's link genes,
    /// in increasing innovation order.
    pub fn links(&self) -> impl Iterator<Item = &LinkGene> {
        self.links.iter()
    }

    /// The genome-level trait map. Never interpreted by the engine.
    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }

    /// Returns `(hidden neuron count, enabled link count)`.
    pub fn complexity(&self) -> (usize, usize) {
        (
            self.neurons.len() - self.input_count - self.output_count,
            self.links.iter().filter(|l| l.enabled()).count(),
        )
    }

    /// Sets the genome's fitness. Fitness must be non-negative.
    ///
    /// # Panics
    /// Panics on a negative fitness value.
    pub fn set_fitness(&mut self, fitness: f64) {
        assert!(fitness >= 0.0, "fitness must be non-negative");
        self.fitness = fitness;
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Marks the genome as evaluated. `Population::epoch` requires
    /// every genome to be evaluated.
    pub fn set_evaluated(&mut self) {
        self.evaluated = true;
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    pub(crate) fn set_birth_generation(&mut self, generation: usize) {
        self.birth_generation = generation;
    }

    pub(crate) fn reset_fitness(&mut self) {
        self.fitness = 0.0;
        self.evaluated = false;
    }

    pub(crate) fn clear_evaluation(&mut self) {
        self.evaluated = false;
    }

    fn neuron(&self, id: NeuronId) -> Option<&NeuronGene> {
        self.neurons.iter().find(|n| n.id() == id)
    }

    fn has_neuron(&self, id: NeuronId) -> bool {
        self.neuron(id).is_some()
    }

    fn has_link(&self, from: NeuronId, to: NeuronId) -> bool {
        self.links.iter().any(|l| l.from() == from && l.to() == to)
    }

    fn insert_link_sorted(&mut self, gene: LinkGene) -> usize {
        let position = self
            .links
            .partition_point(|l| l.innovation() < gene.innovation());
        self.links.insert(position, gene);
        position
    }

    /// Adds a neuron gene verbatim.
    ///
    /// # Errors
    /// Returns an error if a neuron with the same id already exists.
    pub fn add_neuron(&mut self, neuron: NeuronGene) -> Result<&NeuronGene, GeneValidityError> {
        if self.has_neuron(neuron.id()) {
            return Err(GeneValidityError::DuplicateNeuron(neuron.id()));
        }
        self.neurons.push(neuron);
        Ok(self.neurons.last().unwrap())
    }

    /// Adds a link gene verbatim, keeping the link list sorted by
    /// innovation id.
    ///
    /// # Errors
    /// Returns an error if the innovation id or endpoint pair is a
    /// duplicate, either endpoint is missing, or the target is an
    /// input/bias neuron.
    pub fn add_link(&mut self, link: LinkGene) -> Result<&LinkGene, GeneValidityError> {
        if self.links.iter().any(|l| l.innovation() == link.innovation()) {
            return Err(GeneValidityError::DuplicateInnovation(link.innovation()));
        }
        if !self.has_neuron(link.from()) || !self.has_neuron(link.to()) {
            return Err(GeneValidityError::NonexistentEndpoints(
                link.from(),
                link.to(),
            ));
        }
        if matches!(
            self.neuron(link.to()).unwrap().neuron_type(),
            NeuronType::Input | NeuronType::Bias
        ) {
            return Err(GeneValidityError::InputEndpoint(link.to()));
        }
        if self.has_link(link.from(), link.to()) {
            return Err(GeneValidityError::DuplicateEndpoints(link.from(), link.to()));
        }
        let position = self.insert_link_sorted(link);
        Ok(&self.links[position])
    }

    /// Replaces every link weight with a fresh bounded draw.
    /// Used when spawning the initial population from a prototype.
    pub fn randomize_weights(&mut self, params: &Parameters, rng: &mut RandomSource) {
        for link in &mut self.links {
            link.replace_weight(
                rng.float_signed() * params.weight_replacement_max_power,
                params.max_weight,
            );
        }
    }

    /// Induces a weight mutation: each link is either perturbed by a
    /// bounded Gaussian delta or, failing that draw, entirely replaced.
    /// A severe pass widens the perturbation power. All weights end up
    /// clamped to `[-max_weight, max_weight]`.
    pub fn mutate_weights(&mut self, params: &Parameters, rng: &mut RandomSource) {
        let severe = rng.coin(params.mutate_weights_severe_prob);
        let power = if severe {
            params.weight_mutation_max_power * params.severe_mutation_power_boost
        } else {
            params.weight_mutation_max_power
        };
        for link in &mut self.links {
            if rng.coin(params.weight_mutation_rate) {
                link.perturb_weight(rng.gauss_signed() * power, params.max_weight);
            } else if rng.coin(params.weight_replacement_rate) {
                link.replace_weight(
                    rng.float_signed() * params.weight_replacement_max_power,
                    params.max_weight,
                );
            }
        }
    }

    /// Attempts an add-link mutation: up to `link_tries` draws for an
    /// unoccupied `(source, target)` pair satisfying the connectivity
    /// rules (no duplicate endpoints, no input/bias target, loops only
    /// when permitted, recurrence sought with `recurrent_prob`).
    ///
    /// Returns the new link's innovation id, or `None` when every
    /// attempt failed. Exhausting the retries is a no-op, not an error.
    pub fn mutate_add_link(
        &mut self,
        db: &mut InnovationDatabase,
        params: &Parameters,
        rng: &mut RandomSource,
    ) -> Option<Innovation> {
        let targets: Vec<usize> = self
            .neurons
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                !matches!(n.neuron_type(), NeuronType::Input | NeuronType::Bias)
            })
            .map(|(i, _)| i)
            .collect();
        if targets.is_empty() {
            return None;
        }

        for _ in 0..params.link_tries {
            let (from_index, to_index) = if params.allow_loops
                && rng.coin(params.recurrent_loop_prob)
            {
                let t = targets[rng.rand_int(0, targets.len() - 1)];
                (t, t)
            } else {
                (
                    rng.rand_int(0, self.neurons.len() - 1),
                    targets[rng.rand_int(0, targets.len() - 1)],
                )
            };
            if from_index == to_index && !params.allow_loops {
                continue;
            }
            let from = &self.neurons[from_index];
            let to = &self.neurons[to_index];
            let recurrent = to.split_y() <= from.split_y();
            // Non-loop candidates must match the drawn recurrence intent.
            if from_index != to_index && recurrent != rng.coin(params.recurrent_prob) {
                continue;
            }
            if self.has_link(from.id(), to.id()) {
                continue;
            }

            let innovation = db.link_innovation(from.id(), to.id());
            let weight = (rng.float_signed() * params.weight_replacement_max_power)
                .clamp(-params.max_weight, params.max_weight);
            let mut gene = LinkGene::new(innovation, from.id(), to.id(), weight, recurrent);
            gene.traits = init_traits(&params.link_trait_specs, rng);
            self.insert_link_sorted(gene);
            return Some(innovation);
        }
        None
    }

    /// Attempts an add-neuron mutation: disables a random enabled link
    /// and splits it with a new neuron, wired `source → new` at weight
    /// 1.0 and `new → target` at the split link's weight, so the
    /// network's function is approximately preserved. The neuron's
    /// depth is the midpoint of the endpoint depths.
    ///
    /// Innovation ids come from the database keyed on the split link,
    /// so identical splits across the population converge to one
    /// signature; a repeat split within this genome's own lineage takes
    /// fresh ids instead.
    ///
    /// Returns `(neuron id, in-link innovation, out-link innovation)`,
    /// or `None` if the genome has no enabled link to split, in which
    /// case the genome is left unchanged.
    pub fn mutate_add_neuron(
        &mut self,
        db: &mut InnovationDatabase,
        params: &Parameters,
        rng: &mut RandomSource,
    ) -> Option<(NeuronId, Innovation, Innovation)> {
        let enabled: Vec<usize> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.enabled())
            .map(|(i, _)| i)
            .collect();
        if enabled.is_empty() {
            return None;
        }
        let link_index = enabled[rng.rand_int(0, enabled.len() - 1)];
        let (split_innovation, from_id, to_id, old_weight) = {
            let link = &self.links[link_index];
            (link.innovation(), link.from(), link.to(), link.weight())
        };

        let (neuron_id, in_innovation, out_innovation) = {
            let recorded = db.neuron_innovation(split_innovation, false);
            if self.has_neuron(recorded.0) {
                db.neuron_innovation(split_innovation, true)
            } else {
                recorded
            }
        };

        self.links[link_index].set_enabled(false);

        let from_y = self.neuron(from_id).unwrap().split_y();
        let to_y = self.neuron(to_id).unwrap().split_y();
        let split_y = (from_y + to_y) / 2.0;

        let activation =
            ActivationFunction::ALL[rng.roulette(&params.activation_function_probs())];
        let mut neuron = NeuronGene::new(neuron_id, NeuronType::Hidden, activation, split_y);
        neuron.init_shape(
            uniform_in(params.min_activation_a, params.max_activation_a, rng),
            uniform_in(params.min_activation_b, params.max_activation_b, rng),
            uniform_in(
                params.min_neuron_time_constant,
                params.max_neuron_time_constant,
                rng,
            ),
            uniform_in(params.min_neuron_bias, params.max_neuron_bias, rng),
        );
        neuron.traits = init_traits(&params.neuron_trait_specs, rng);
        self.neurons.push(neuron);

        let mut in_gene = LinkGene::new(
            in_innovation,
            from_id,
            neuron_id,
            1.0_f64.min(params.max_weight),
            split_y <= from_y,
        );
        in_gene.traits = init_traits(&params.link_trait_specs, rng);
        self.insert_link_sorted(in_gene);

        let mut out_gene = LinkGene::new(
            out_innovation,
            neuron_id,
            to_id,
            old_weight,
            to_y <= split_y,
        );
        out_gene.traits = init_traits(&params.link_trait_specs, rng);
        self.insert_link_sorted(out_gene);

        Some((neuron_id, in_innovation, out_innovation))
    }

    /// Attempts a remove-link mutation: deletes a random enabled link,
    /// never one that is the last enabled input of an output neuron
    /// (an output must not be fully disconnected).
    ///
    /// Returns the removed link's innovation id, or `None` when no
    /// link may be removed.
    pub fn mutate_remove_link(&mut self, rng: &mut RandomSource) -> Option<Innovation> {
        let candidates: Vec<usize> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                if !l.enabled() {
                    return false;
                }
                let target = self.neuron(l.to()).unwrap();
                if target.neuron_type() != NeuronType::Output {
                    return true;
                }
                self.links
                    .iter()
                    .filter(|other| other.enabled() && other.to() == l.to())
                    .count()
                    > 1
            })
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = candidates[rng.rand_int(0, candidates.len() - 1)];
        let gene = self.links.remove(index);
        Some(gene.innovation())
    }

    /// Reassigns a random hidden/output neuron's activation tag by a
    /// weighted draw across the configured per-function probabilities.
    fn mutate_activation_type(&mut self, params: &Parameters, rng: &mut RandomSource) {
        if let Some(index) = self.mutable_neuron_index(rng) {
            let function =
                ActivationFunction::ALL[rng.roulette(&params.activation_function_probs())];
            self.neurons[index].set_activation(function);
        }
    }

    fn mutate_activation_a(&mut self, params: &Parameters, rng: &mut RandomSource) {
        if let Some(index) = self.mutable_neuron_index(rng) {
            let neuron = &mut self.neurons[index];
            let a = (neuron.a() + rng.gauss_signed() * params.activation_a_mutation_max_power)
                .clamp(params.min_activation_a, params.max_activation_a);
            neuron.set_a(a);
        }
    }

    fn mutate_activation_b(&mut self, params: &Parameters, rng: &mut RandomSource) {
        if let Some(index) = self.mutable_neuron_index(rng) {
            let neuron = &mut self.neurons[index];
            let b = (neuron.b() + rng.gauss_signed() * params.activation_b_mutation_max_power)
                .clamp(params.min_activation_b, params.max_activation_b);
            neuron.set_b(b);
        }
    }

    fn mutate_time_constant(&mut self, params: &Parameters, rng: &mut RandomSource) {
        if let Some(index) = self.mutable_neuron_index(rng) {
            let neuron = &mut self.neurons[index];
            let tc = (neuron.time_constant()
                + rng.gauss_signed() * params.time_constant_mutation_max_power)
                .clamp(
                    params.min_neuron_time_constant,
                    params.max_neuron_time_constant,
                );
            neuron.set_time_constant(tc);
        }
    }

    fn mutate_neuron_bias(&mut self, params: &Parameters, rng: &mut RandomSource) {
        if let Some(index) = self.mutable_neuron_index(rng) {
            let neuron = &mut self.neurons[index];
            let bias = (neuron.bias() + rng.gauss_signed() * params.bias_mutation_max_power)
                .clamp(params.min_neuron_bias, params.max_neuron_bias);
            neuron.set_bias(bias);
        }
    }

    fn mutable_neuron_index(&self, rng: &mut RandomSource) -> Option<usize> {
        let candidates: Vec<usize> = self
            .neurons
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                matches!(n.neuron_type(), NeuronType::Hidden | NeuronType::Output)
            })
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            None
        } else {
            Some(candidates[rng.rand_int(0, candidates.len() - 1)])
        }
    }

    /// Applies every mutation operator behind its own independent
    /// probability gate. Operators are not mutually exclusive; any
    /// subset may fire on one offspring.
    pub fn mutate(
        &mut self,
        db: &mut InnovationDatabase,
        params: &Parameters,
        rng: &mut RandomSource,
    ) {
        if rng.coin(params.mutate_add_neuron_prob) {
            let _ = self.mutate_add_neuron(db, params, rng);
        }
        if rng.coin(params.mutate_add_link_prob) {
            let _ = self.mutate_add_link(db, params, rng);
        }
        if rng.coin(params.mutate_rem_link_prob) {
            let _ = self.mutate_remove_link(rng);
        }
        if rng.coin(params.mutate_weights_prob) {
            self.mutate_weights(params, rng);
        }
        if rng.coin(params.mutate_neuron_activation_type_prob) {
            self.mutate_activation_type(params, rng);
        }
        if rng.coin(params.mutate_activation_a_prob) {
            self.mutate_activation_a(params, rng);
        }
        if rng.coin(params.mutate_activation_b_prob) {
            self.mutate_activation_b(params, rng);
        }
        if rng.coin(params.mutate_neuron_time_constants_prob) {
            self.mutate_time_constant(params, rng);
        }
        if rng.coin(params.mutate_neuron_bias_prob) {
            self.mutate_neuron_bias(params, rng);
        }
        if rng.coin(params.mutate_neuron_traits_prob) {
            if let Some(index) = self.mutable_neuron_index(rng) {
                mutate_traits(
                    &mut self.neurons[index].traits,
                    &params.neuron_trait_specs,
                    rng,
                );
            }
        }
        if rng.coin(params.mutate_link_traits_prob) && !self.links.is_empty() {
            let index = rng.rand_int(0, self.links.len() - 1);
            mutate_traits(&mut self.links[index].traits, &params.link_trait_specs, rng);
        }
        if rng.coin(params.mutate_genome_traits_prob) {
            mutate_traits(&mut self.traits, &params.genome_trait_specs, rng);
        }
    }

    /// Combines two same-species parents into a child genome.
    ///
    /// Link genes are aligned by innovation id. Matching genes come
    /// from a uniformly chosen parent (weights averaged instead when
    /// this mating drew multipoint-averaging mode); a matching gene
    /// disabled in either parent stays disabled in the child with
    /// `inherit_disabled_rate`. Disjoint and excess genes come from
    /// the fitter parent; on a fitness tie, each parent's unmatched
    /// gene is inherited with `tie_inherit_rate`. The child's neuron
    /// set is the union required by its links, each neuron copied from
    /// the parent that carries it (fitter parent preferred).
    ///
    /// The caller assigns the child's id and birth generation.
    pub fn mate(
        parent1: &Genome,
        parent2: &Genome,
        params: &Parameters,
        rng: &mut RandomSource,
    ) -> Genome {
        let tie = (parent1.fitness - parent2.fitness).abs() < f64::EPSILON;
        let (fitter, weaker) = if parent2.fitness > parent1.fitness {
            (parent2, parent1)
        } else {
            (parent1, parent2)
        };
        let averaging = rng.coin(params.multipoint_crossover_rate);

        let mut links: Vec<LinkGene> = Vec::with_capacity(fitter.links.len());
        let (mut i, mut j) = (0, 0);
        while i < fitter.links.len() || j < weaker.links.len() {
            match (fitter.links.get(i), weaker.links.get(j)) {
                (Some(a), Some(b)) if a.innovation() == b.innovation() => {
                    let mut gene = if rng.coin(0.5) { a.clone() } else { b.clone() };
                    if averaging {
                        gene.weight = (a.weight() + b.weight()) / 2.0;
                    }
                    if !a.enabled() || !b.enabled() {
                        gene.enabled = !rng.coin(params.inherit_disabled_rate);
                    }
                    gene.traits = mate_traits(a.traits(), b.traits(), rng);
                    links.push(gene);
                    i += 1;
                    j += 1;
                }
                (Some(a), Some(b)) if a.innovation() < b.innovation() => {
                    if !tie || rng.coin(params.tie_inherit_rate) {
                        links.push(a.clone());
                    }
                    i += 1;
                }
                (Some(_), Some(b)) => {
                    if tie && rng.coin(params.tie_inherit_rate) {
                        links.push(b.clone());
                    }
                    j += 1;
                }
                (Some(a), None) => {
                    if !tie || rng.coin(params.tie_inherit_rate) {
                        links.push(a.clone());
                    }
                    i += 1;
                }
                (None, Some(b)) => {
                    if tie && rng.coin(params.tie_inherit_rate) {
                        links.push(b.clone());
                    }
                    j += 1;
                }
                (None, None) => unreachable!(),
            }
        }

        // Inputs and outputs always carry over; hidden neurons follow
        // the links that reference them, copied from the parent that
        // contributed them (fitter parent preferred when both do).
        let io_count = fitter.input_count + fitter.output_count;
        let mut neurons: Vec<NeuronGene> = fitter.neurons[..io_count].to_vec();
        for gene in &links {
            for id in [gene.from(), gene.to()] {
                if neurons.iter().any(|n| n.id() == id) {
                    continue;
                }
                let neuron = fitter
                    .neuron(id)
                    .or_else(|| weaker.neuron(id))
                    .expect("inherited link references a neuron absent from both parents");
                neurons.push(neuron.clone());
            }
        }

        Genome {
            id: 0,
            birth_generation: 0,
            input_count: fitter.input_count,
            output_count: fitter.output_count,
            neurons,
            links,
            traits: mate_traits(&fitter.traits, &weaker.traits, rng),
            fitness: 0.0,
            evaluated: false,
        }
    }

    /// Computes the compatibility distance between two genomes:
    /// `c1·E/N + c2·D/N + c3·W̄`, where `E` and `D` are the excess and
    /// disjoint gene counts, `W̄` the mean weight difference over
    /// matching genes, and `N` the larger genome's link count when
    /// `normalize_genome_size` is set (1 otherwise, so small
    /// early-generation genomes are not over-penalized).
    ///
    /// Symmetric: `distance(a, b) == distance(b, a)`.
    pub fn compatibility_distance(a: &Genome, b: &Genome, params: &Parameters) -> f64 {
        let mut matching = 0usize;
        let mut weight_diff = 0.0;
        let mut disjoint = 0usize;
        let mut excess = 0usize;

        if a.links.is_empty() || b.links.is_empty() {
            excess = a.links.len() + b.links.len();
        } else {
            let boundary = a
                .links
                .last()
                .unwrap()
                .innovation()
                .min(b.links.last().unwrap().innovation());
            let (mut i, mut j) = (0, 0);
            while i < a.links.len() || j < b.links.len() {
                match (a.links.get(i), b.links.get(j)) {
                    (Some(x), Some(y)) if x.innovation() == y.innovation() => {
                        matching += 1;
                        weight_diff += (x.weight() - y.weight()).abs();
                        i += 1;
                        j += 1;
                    }
                    (Some(x), Some(y)) => {
                        let unmatched = if x.innovation() < y.innovation() {
                            i += 1;
                            x
                        } else {
                            j += 1;
                            y
                        };
                        if unmatched.innovation() > boundary {
                            excess += 1;
                        } else {
                            disjoint += 1;
                        }
                    }
                    (Some(x), None) => {
                        if x.innovation() > boundary {
                            excess += 1;
                        } else {
                            disjoint += 1;
                        }
                        i += 1;
                    }
                    (None, Some(y)) => {
                        if y.innovation() > boundary {
                            excess += 1;
                        } else {
                            disjoint += 1;
                        }
                        j += 1;
                    }
                    (None, None) => unreachable!(),
                }
            }
        }

        let n = if params.normalize_genome_size {
            a.links.len().max(b.links.len()).max(1) as f64
        } else {
            1.0
        };
        let mean_weight_diff = if matching > 0 {
            weight_diff / matching as f64
        } else {
            0.0
        };
        params.excess_coeff * excess as f64 / n
            + params.disjoint_coeff * disjoint as f64 / n
            + params.weight_diff_coeff * mean_weight_diff
    }

    /// Builds the direct phenotype: one network neuron per neuron gene,
    /// one connection per enabled link gene.
    pub fn build_phenotype(&self) -> NeuralNetwork {
        NeuralNetwork::new(self)
    }

    /// Builds the HyperNEAT phenotype: this genome acts as a CPPN
    /// mapping substrate coordinate pairs to connection weights.
    ///
    /// # Errors
    /// Fails when the genome's input/output counts don't match the
    /// CPPN arity the substrate requires.
    pub fn build_hyperneat_phenotype(
        &self,
        substrate: &Substrate,
    ) -> Result<NeuralNetwork, PhenotypeError> {
        NeuralNetwork::from_substrate(self, substrate)
    }
}

fn uniform_in(min: f64, max: f64, rng: &mut RandomSource) -> f64 {
    min + rng.float() * (max - min)
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("id", &self.id)
            .field("neurons", &self.neurons.len())
            .field("links", &self.links.len())
            .field("fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> Parameters {
        Parameters {
            weight_replacement_max_power: 1.0,
            max_weight: 8.0,
            link_tries: 64,
            ..Parameters::defaults()
        }
    }

    fn seed_genome(rng: &mut RandomSource) -> Genome {
        Genome::new(
            0,
            3,
            1,
            ActivationFunction::UnsignedSigmoid,
            &test_params(),
            rng,
        )
    }

    #[test]
    fn new_is_fully_connected() {
        let mut rng = RandomSource::seeded(1);
        let genome = seed_genome(&mut rng);
        assert_eq!(genome.neurons().count(), 4);
        assert_eq!(genome.links().count(), 3);
        assert_eq!(genome.complexity(), (0, 3));
        // Initial innovation numbering is o + i * outputs.
        for (expected, link) in genome.links().enumerate() {
            assert_eq!(link.innovation(), expected);
        }
    }

    #[test]
    fn unconnected_has_no_links() {
        let mut rng = RandomSource::seeded(1);
        let params = test_params();
        let genome =
            Genome::unconnected(0, 2, 1, ActivationFunction::Tanh, &params, &mut rng);
        assert_eq!(genome.links().count(), 0);
        assert_eq!(genome.neurons().count(), 3);
    }

    #[test]
    fn weights_stay_clamped_after_mutation() {
        let params = Parameters {
            weight_mutation_rate: 1.0,
            mutate_weights_severe_prob: 1.0,
            severe_mutation_power_boost: 100.0,
            weight_mutation_max_power: 10.0,
            max_weight: 3.0,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(5);
        let mut genome =
            Genome::new(0, 3, 2, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
        for _ in 0..100 {
            genome.mutate_weights(&params, &mut rng);
            assert!(genome.links().all(|l| l.weight().abs() <= params.max_weight));
        }
    }

    #[test]
    fn add_link_creates_no_duplicates() {
        let params = test_params();
        let mut rng = RandomSource::seeded(7);
        let mut genome = seed_genome(&mut rng);
        let mut db = InnovationDatabase::new(3, 1);
        for _ in 0..50 {
            let _ = genome.mutate_add_link(&mut db, &params, &mut rng);
        }
        let mut endpoint_pairs: Vec<(usize, usize)> =
            genome.links().map(|l| (l.from(), l.to())).collect();
        let total = endpoint_pairs.len();
        endpoint_pairs.sort_unstable();
        endpoint_pairs.dedup();
        assert_eq!(endpoint_pairs.len(), total);

        let mut innovations: Vec<usize> = genome.links().map(|l| l.innovation()).collect();
        innovations.dedup();
        assert_eq!(innovations.len(), total);
    }

    #[test]
    fn add_link_respects_loop_prohibition() {
        let params = Parameters {
            allow_loops: false,
            recurrent_prob: 1.0,
            recurrent_loop_prob: 1.0,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(9);
        let mut genome = seed_genome(&mut rng);
        let mut db = InnovationDatabase::new(3, 1);
        for _ in 0..100 {
            let _ = genome.mutate_add_link(&mut db, &params, &mut rng);
        }
        assert!(genome.links().all(|l| l.from() != l.to()));
    }

    #[test]
    fn add_neuron_splits_a_link() {
        let params = test_params();
        let mut rng = RandomSource::seeded(11);
        let mut genome = seed_genome(&mut rng);
        let mut db = InnovationDatabase::new(3, 1);

        let before: Vec<LinkGene> = genome.links().cloned().collect();
        let (neuron, in_link, out_link) =
            genome.mutate_add_neuron(&mut db, &params, &mut rng).unwrap();

        let split = before
            .iter()
            .find(|l| !genome.links().find(|g| g.innovation() == l.innovation()).unwrap().enabled())
            .unwrap();

        let in_gene = genome.links().find(|l| l.innovation() == in_link).unwrap();
        let out_gene = genome.links().find(|l| l.innovation() == out_link).unwrap();
        assert_eq!(in_gene.from(), split.from());
        assert_eq!(in_gene.to(), neuron);
        assert_eq!(in_gene.weight(), 1.0);
        assert_eq!(out_gene.from(), neuron);
        assert_eq!(out_gene.to(), split.to());
        assert_eq!(out_gene.weight(), split.weight());

        let new_neuron = genome.neurons().find(|n| n.id() == neuron).unwrap();
        assert_eq!(new_neuron.neuron_type(), NeuronType::Hidden);
        assert!((new_neuron.split_y() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn add_neuron_without_enabled_links_is_a_noop() {
        let params = test_params();
        let mut rng = RandomSource::seeded(13);
        let mut genome =
            Genome::unconnected(0, 3, 1, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
        let mut db = InnovationDatabase::new(3, 1);

        let before = genome.clone();
        assert!(genome.mutate_add_neuron(&mut db, &params, &mut rng).is_none());
        assert_eq!(genome, before);
    }

    #[test]
    fn identical_splits_in_two_genomes_share_ids() {
        let params = test_params();
        let mut rng = RandomSource::seeded(15);
        let mut db = InnovationDatabase::new(3, 1);
        let mut first = seed_genome(&mut rng);
        let mut second = seed_genome(&mut rng);

        // Force both genomes to split the same link by leaving only
        // link 0 enabled.
        for genome in [&mut first, &mut second] {
            for innovation in [1, 2] {
                let index = genome
                    .links
                    .iter()
                    .position(|l| l.innovation() == innovation)
                    .unwrap();
                genome.links[index].set_enabled(false);
            }
        }

        let a = first.mutate_add_neuron(&mut db, &params, &mut rng).unwrap();
        let b = second.mutate_add_neuron(&mut db, &params, &mut rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn remove_link_never_disconnects_an_output() {
        let params = test_params();
        let mut rng = RandomSource::seeded(17);
        let mut genome = seed_genome(&mut rng);
        // 3 enabled input->output links; two removals leave the last
        // one locked in place.
        assert!(genome.mutate_remove_link(&mut rng).is_some());
        assert!(genome.mutate_remove_link(&mut rng).is_some());
        assert!(genome.mutate_remove_link(&mut rng).is_none());
        assert_eq!(genome.links().filter(|l| l.enabled()).count(), 1);
    }

    #[test]
    fn distance_is_symmetric() {
        let params = Parameters {
            normalize_genome_size: true,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(19);
        let mut db = InnovationDatabase::new(3, 1);
        let mut a = seed_genome(&mut rng);
        let mut b = seed_genome(&mut rng);
        for _ in 0..10 {
            a.mutate(&mut db, &params, &mut rng);
            b.mutate(&mut db, &params, &mut rng);
            let ab = Genome::compatibility_distance(&a, &b, &params);
            let ba = Genome::compatibility_distance(&b, &a, &params);
            assert_eq!(ab, ba);
            assert!(ab >= 0.0);
        }
    }

    #[test]
    fn distance_counts_excess_and_disjoint() {
        let params = Parameters {
            excess_coeff: 1.0,
            disjoint_coeff: 1.0,
            weight_diff_coeff: 0.5,
            normalize_genome_size: false,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(21);
        let base = Parameters::defaults();
        let mut a = Genome::unconnected(0, 2, 1, ActivationFunction::UnsignedSigmoid, &base, &mut rng);
        let mut b = a.clone();
        a.add_neuron(NeuronGene::new(3, NeuronType::Hidden, ActivationFunction::UnsignedSigmoid, 0.5))
            .unwrap();
        b.add_neuron(NeuronGene::new(3, NeuronType::Hidden, ActivationFunction::UnsignedSigmoid, 0.5))
            .unwrap();

        // Matching gene with weight difference 2.0.
        a.add_link(LinkGene::new(0, 0, 2, 1.0, false)).unwrap();
        b.add_link(LinkGene::new(0, 0, 2, -1.0, false)).unwrap();
        // Disjoint on each side.
        a.add_link(LinkGene::new(1, 1, 2, 3.0, false)).unwrap();
        b.add_link(LinkGene::new(2, 1, 3, 1.0, false)).unwrap();
        // Matching gene, equal weights.
        a.add_link(LinkGene::new(3, 3, 2, 1.0, false)).unwrap();
        b.add_link(LinkGene::new(3, 3, 2, 1.0, false)).unwrap();
        // Excess on a's side.
        a.add_link(LinkGene::new(4, 2, 3, 3.0, false)).unwrap();

        let expected = 1.0 * 1.0 + 1.0 * 2.0 + 0.5 * (2.0 + 0.0) / 2.0;
        assert_eq!(Genome::compatibility_distance(&a, &b, &params), expected);
    }

    #[test]
    fn crossover_child_genes_trace_to_a_parent() {
        let params = Parameters {
            multipoint_crossover_rate: 0.0,
            tie_inherit_rate: 1.0,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(23);
        let mut db = InnovationDatabase::new(3, 1);
        let mut p1 = seed_genome(&mut rng);
        let mut p2 = seed_genome(&mut rng);
        for _ in 0..15 {
            p1.mutate(&mut db, &params, &mut rng);
            p2.mutate(&mut db, &params, &mut rng);
        }
        p1.set_fitness(10.0);
        p2.set_fitness(5.0);

        let child = Genome::mate(&p1, &p2, &params, &mut rng);
        for gene in child.links() {
            let in_p1 = p1
                .links()
                .find(|l| l.innovation() == gene.innovation())
                .map(|l| l.weight() == gene.weight())
                .unwrap_or(false);
            let in_p2 = p2
                .links()
                .find(|l| l.innovation() == gene.innovation())
                .map(|l| l.weight() == gene.weight())
                .unwrap_or(false);
            assert!(
                in_p1 || in_p2,
                "child gene {} matches neither parent",
                gene.innovation()
            );
        }
        // Every unmatched gene must trace to the fitter parent.
        for gene in child.links() {
            if p2.links().all(|l| l.innovation() != gene.innovation()) {
                assert!(p1.links().any(|l| l.innovation() == gene.innovation()));
            }
        }
        // Neuron ids referenced by inherited links are present.
        for gene in child.links() {
            assert!(child.neurons().any(|n| n.id() == gene.from()));
            assert!(child.neurons().any(|n| n.id() == gene.to()));
        }
    }

    #[test]
    fn crossover_averaging_interpolates_matching_weights() {
        let params = Parameters {
            multipoint_crossover_rate: 1.0,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(25);
        let p1 = seed_genome(&mut rng);
        let mut p2 = p1.clone();
        for link in &mut p2.links {
            let w = link.weight();
            link.replace_weight(w + 1.0, params.max_weight);
        }

        let child = Genome::mate(&p1, &p2, &params, &mut rng);
        for gene in child.links() {
            let w1 = p1
                .links()
                .find(|l| l.innovation() == gene.innovation())
                .unwrap()
                .weight();
            let w2 = p2
                .links()
                .find(|l| l.innovation() == gene.innovation())
                .unwrap()
                .weight();
            assert!((gene.weight() - (w1 + w2) / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn crossover_can_keep_disabled_genes_disabled() {
        let params = Parameters {
            inherit_disabled_rate: 1.0,
            ..test_params()
        };
        let mut rng = RandomSource::seeded(27);
        let p1 = seed_genome(&mut rng);
        let mut p2 = p1.clone();
        p2.links[0].set_enabled(false);

        let child = Genome::mate(&p1, &p2, &params, &mut rng);
        assert!(!child.links().next().unwrap().enabled());
    }

    #[test]
    fn serde_round_trip() {
        let mut rng = RandomSource::seeded(29);
        let params = test_params();
        let mut db = InnovationDatabase::new(3, 1);
        let mut genome = seed_genome(&mut rng);
        for _ in 0..10 {
            genome.mutate(&mut db, &params, &mut rng);
        }
        let copy: Genome = serde_json::from_str(&serde_json::to_string(&genome).unwrap()).unwrap();
        assert_eq!(genome, copy);
    }
}
