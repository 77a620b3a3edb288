//! Executable phenotypes.
//!
//! A [`NeuralNetwork`] is a near-isomorphism of a genome: one network
//! neuron per neuron gene and one connection per enabled link gene
//! (direct encoding), or a substrate-shaped network whose weights were
//! queried from the genome acting as a CPPN (HyperNEAT encoding).
//!
//! Activation is a discrete-time protocol. Every `activate` call
//! propagates exactly one step: all incoming sums are computed from
//! the activations as they stood before the step, so recurrent links
//! see one-step-delayed feedback. The caller decides how many steps a
//! network needs; there is no settling detection.

use crate::genomics::{ActivationFunction, Genome, NeuronType, PhenotypeError};
use crate::substrate::Substrate;
use crate::NeuronId;

use ahash::RandomState;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Connection {
    source: usize,
    target: usize,
    weight: f64,
    recurrent: bool,
}

#[derive(Clone, Debug)]
struct NetNeuron {
    activation: f64,
    sum: f64,
    incoming: usize,
    function: ActivationFunction,
    a: f64,
    b: f64,
    bias: f64,
    time_constant: f64,
    role: NeuronType,
}

impl NetNeuron {
    fn stateless(
        function: ActivationFunction,
        role: NeuronType,
    ) -> NetNeuron {
        NetNeuron {
            activation: 0.0,
            sum: 0.0,
            incoming: 0,
            function,
            a: 1.0,
            b: 0.0,
            bias: 0.0,
            time_constant: 1.0,
            role,
        }
    }
}

/// An arbitrarily-structured neural network.
///
/// Neurons are laid out inputs first, then outputs, then hidden, so
/// [`outputs`] is a cheap slice read.
///
/// [`outputs`]: NeuralNetwork::outputs
pub struct NeuralNetwork {
    input_count: usize,
    output_count: usize,
    neurons: Vec<NetNeuron>,
    connections: Vec<Connection>,
}

impl NeuralNetwork {
    /// Builds the direct phenotype of a genome. Disabled link genes
    /// are not expressed.
    ///
    /// # Examples
    /// ```
    /// use polyneat::{Parameters, RandomSource};
    /// use polyneat::genomics::{ActivationFunction, Genome};
    /// use polyneat::networks::NeuralNetwork;
    ///
    /// let params = Parameters::defaults();
    /// let mut rng = RandomSource::seeded(0);
    /// let genome = Genome::new(0, 3, 1, ActivationFunction::UnsignedSigmoid, &params, &mut rng);
    ///
    /// let mut network = NeuralNetwork::new(&genome);
    /// network.load_inputs(&[0.5, 0.5, 1.0]);
    /// network.activate();
    /// assert_eq!(network.outputs().len(), 1);
    /// ```
    pub fn new(genome: &Genome) -> NeuralNetwork {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut hidden = Vec::new();
        for gene in genome.neurons() {
            match gene.neuron_type() {
                NeuronType::Input | NeuronType::Bias => inputs.push(gene),
                NeuronType::Output => outputs.push(gene),
                NeuronType::Hidden => hidden.push(gene),
            }
        }
        let ordered: Vec<_> = inputs
            .iter()
            .chain(outputs.iter())
            .chain(hidden.iter())
            .copied()
            .collect();
        let index_of: HashMap<NeuronId, usize, RandomState> = ordered
            .iter()
            .enumerate()
            .map(|(index, gene)| (gene.id(), index))
            .collect();

        let mut neurons: Vec<NetNeuron> = ordered
            .iter()
            .map(|gene| NetNeuron {
                activation: 0.0,
                sum: 0.0,
                incoming: 0,
                function: gene.activation(),
                a: gene.a(),
                b: gene.b(),
                bias: gene.bias(),
                time_constant: gene.time_constant(),
                role: gene.neuron_type(),
            })
            .collect();

        let mut connections = Vec::new();
        for link in genome.links().filter(|l| l.enabled()) {
            let source = index_of[&link.from()];
            let target = index_of[&link.to()];
            neurons[target].incoming += 1;
            connections.push(Connection {
                source,
                target,
                weight: link.weight(),
                recurrent: link.recurrent(),
            });
        }

        NeuralNetwork {
            input_count: inputs.len(),
            output_count: outputs.len(),
            neurons,
            connections,
        }
    }

    /// Decodes a substrate-shaped phenotype from a genome acting as a
    /// CPPN: for every permitted directed coordinate pair the genome
    /// is activated on the pair's coordinates (plus the optional
    /// distance term and a constant 1.0), and its first output becomes
    /// a connection weight when its magnitude clears the substrate's
    /// link threshold, rescaled to `max_weight_and_bias`.
    pub(crate) fn from_substrate(
        genome: &Genome,
        substrate: &Substrate,
    ) -> Result<NeuralNetwork, PhenotypeError> {
        let expected_inputs = substrate.min_cppn_inputs();
        if genome.input_count() != expected_inputs {
            return Err(PhenotypeError::CppnInputMismatch {
                genome: genome.id(),
                expected: expected_inputs,
                actual: genome.input_count(),
            });
        }
        let expected_outputs = substrate.min_cppn_outputs();
        if genome.output_count() < expected_outputs {
            return Err(PhenotypeError::CppnOutputMismatch {
                genome: genome.id(),
                expected: expected_outputs,
                actual: genome.output_count(),
            });
        }

        let mut cppn = NeuralNetwork::new(genome);
        let steps = cppn.depth();

        let input_count = substrate.inputs().len();
        let output_count = substrate.outputs().len();
        let mut neurons =
            Vec::with_capacity(input_count + output_count + substrate.hidden().len());
        for _ in substrate.inputs() {
            neurons.push(NetNeuron::stateless(
                ActivationFunction::Linear,
                NeuronType::Input,
            ));
        }
        for _ in substrate.outputs() {
            neurons.push(NetNeuron::stateless(
                substrate.output_activation,
                NeuronType::Output,
            ));
        }
        for _ in substrate.hidden() {
            neurons.push(NetNeuron::stateless(
                substrate.hidden_activation,
                NeuronType::Hidden,
            ));
        }

        struct Layer<'a> {
            coords: &'a [Vec<f64>],
            base: usize,
            depth: f64,
        }
        let input_layer = Layer {
            coords: substrate.inputs(),
            base: 0,
            depth: 0.0,
        };
        let output_layer = Layer {
            coords: substrate.outputs(),
            base: input_count,
            depth: 1.0,
        };
        let hidden_layer = Layer {
            coords: substrate.hidden(),
            base: input_count + output_count,
            depth: 0.5,
        };

        let groups: [(&Layer, &Layer, bool, bool); 6] = [
            (
                &input_layer,
                &hidden_layer,
                substrate.allow_input_hidden_links,
                false,
            ),
            (
                &input_layer,
                &output_layer,
                substrate.allow_input_output_links,
                false,
            ),
            (
                &hidden_layer,
                &hidden_layer,
                substrate.allow_hidden_hidden_links,
                substrate.allow_looped_hidden_links,
            ),
            (
                &hidden_layer,
                &output_layer,
                substrate.allow_hidden_output_links,
                false,
            ),
            (
                &output_layer,
                &hidden_layer,
                substrate.allow_output_hidden_links,
                false,
            ),
            (
                &output_layer,
                &output_layer,
                substrate.allow_output_output_links,
                substrate.allow_looped_output_links,
            ),
        ];

        let threshold = substrate.link_threshold;
        let span = (1.0 - threshold).max(f64::EPSILON);
        let mut connections = Vec::new();
        for (src, tgt, pair_allowed, loops_allowed) in groups {
            if !pair_allowed && !loops_allowed {
                continue;
            }
            for (i, src_coord) in src.coords.iter().enumerate() {
                for (j, tgt_coord) in tgt.coords.iter().enumerate() {
                    let is_loop = src.base == tgt.base && i == j;
                    if is_loop {
                        if !loops_allowed {
                            continue;
                        }
                    } else if !pair_allowed {
                        continue;
                    }

                    let output =
                        query_cppn(&mut cppn, steps, substrate, src_coord, tgt_coord);
                    if output.abs() > threshold {
                        let weight = output.signum() * (output.abs() - threshold) / span
                            * substrate.max_weight_and_bias;
                        let target = tgt.base + j;
                        neurons[target].incoming += 1;
                        connections.push(Connection {
                            source: src.base + i,
                            target,
                            weight,
                            recurrent: tgt.depth <= src.depth,
                        });
                    }
                }
            }
        }

        Ok(NeuralNetwork {
            input_count,
            output_count,
            neurons,
            connections,
        })
    }

    /// Zeroes all neuron state.
    pub fn flush(&mut self) {
        for neuron in &mut self.neurons {
            neuron.activation = 0.0;
            neuron.sum = 0.0;
        }
    }

    /// Loads external values into the input neurons. The caller
    /// supplies one value per input neuron, the bias position
    /// (conventionally the last input) included.
    ///
    /// # Panics
    /// Panics if `values.len()` differs from the network's input count.
    pub fn load_inputs(&mut self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.input_count,
            "expected {} input values, got {}",
            self.input_count,
            values.len()
        );
        for (neuron, value) in self.neurons.iter_mut().zip(values) {
            neuron.activation = *value;
        }
    }

    /// Propagates one discrete time step.
    ///
    /// All incoming sums are computed from pre-step activations, then
    /// every neuron with at least one incoming connection applies its
    /// activation function. Neurons without incoming connections hold
    /// their state, so a network with no connections keeps outputting
    /// zeros. Information crosses one connection per step; deeper
    /// networks need as many steps as their longest path.
    pub fn activate(&mut self) {
        self.accumulate_sums();
        for neuron in &mut self.neurons {
            if matches!(neuron.role, NeuronType::Input | NeuronType::Bias)
                || neuron.incoming == 0
            {
                neuron.sum = 0.0;
                continue;
            }
            neuron.activation = neuron.function.apply(neuron.sum, neuron.a, neuron.b);
            neuron.sum = 0.0;
        }
    }

    /// Propagates one leaky-integrator step of size `dt`: each neuron
    /// moves toward `f(sum + bias)` at a rate set by its time
    /// constant.
    pub fn activate_leaky(&mut self, dt: f64) {
        self.accumulate_sums();
        for neuron in &mut self.neurons {
            if matches!(neuron.role, NeuronType::Input | NeuronType::Bias)
                || neuron.incoming == 0
            {
                neuron.sum = 0.0;
                continue;
            }
            let target = neuron
                .function
                .apply(neuron.sum + neuron.bias, neuron.a, neuron.b);
            let tau = neuron.time_constant.max(f64::EPSILON);
            neuron.activation += (dt / tau) * (target - neuron.activation);
            neuron.sum = 0.0;
        }
    }

    fn accumulate_sums(&mut self) {
        for index in 0..self.connections.len() {
            let connection = self.connections[index];
            let value = self.neurons[connection.source].activation * connection.weight;
            self.neurons[connection.target].sum += value;
        }
    }

    /// Reads the current output activations.
    pub fn outputs(&self) -> Vec<f64> {
        self.neurons[self.input_count..self.input_count + self.output_count]
            .iter()
            .map(|n| n.activation)
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn hidden_count(&self) -> usize {
        self.neurons.len() - self.input_count - self.output_count
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections flagged recurrent (target depth at or
    /// before source depth, self-loops included).
    pub fn recurrent_connection_count(&self) -> usize {
        self.connections.iter().filter(|c| c.recurrent).count()
    }

    /// Length of the longest acyclic path from any input, in
    /// connections; at least 1. Used as the CPPN settling step count
    /// during substrate decoding.
    pub(crate) fn depth(&self) -> usize {
        let mut adjacency = vec![Vec::new(); self.neurons.len()];
        for connection in &self.connections {
            adjacency[connection.source].push(connection.target);
        }
        let mut visited = vec![false; self.neurons.len()];
        let mut best = 1;
        for root in 0..self.input_count {
            visited[root] = true;
            best = best.max(longest_path(&adjacency, root, &mut visited, 0));
            visited[root] = false;
        }
        best
    }
}

fn longest_path(
    adjacency: &[Vec<usize>],
    node: usize,
    visited: &mut [bool],
    current: usize,
) -> usize {
    let mut best = current;
    for &next in &adjacency[node] {
        if !visited[next] {
            visited[next] = true;
            best = best.max(longest_path(adjacency, next, visited, current + 1));
            visited[next] = false;
        }
    }
    best
}

fn query_cppn(
    cppn: &mut NeuralNetwork,
    steps: usize,
    substrate: &Substrate,
    src: &[f64],
    tgt: &[f64],
) -> f64 {
    let mut query = Vec::with_capacity(cppn.input_count);
    query.extend_from_slice(src);
    query.extend_from_slice(tgt);
    if substrate.with_distance {
        let distance = src
            .iter()
            .zip(tgt)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt();
        query.push(distance);
    }
    query.push(1.0);
    cppn.flush();
    cppn.load_inputs(&query);
    for _ in 0..steps {
        cppn.activate();
    }
    cppn.outputs()[0]
}

impl fmt::Debug for NeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuralNetwork")
            .field("inputs", &self.input_count)
            .field("outputs", &self.output_count)
            .field("hidden", &self.hidden_count())
            .field("connections", &self.connections.len())
            .finish()
    }
}
