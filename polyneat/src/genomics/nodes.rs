use crate::genomics::traits::TraitMap;
use crate::NeuronId;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a neuron plays in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeuronType {
    /// Externally driven node.
    Input,
    /// Input node the caller feeds a constant 1.0.
    Bias,
    /// Internal node.
    Hidden,
    /// Readout node.
    Output,
}

/// The activation function a neuron's network equivalent applies.
///
/// Each tag is a pure numeric formula over the input sum `x` and the
/// neuron's shape parameters `a` (slope/gain) and `b` (shift).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// 2 / (1 + exp(-a·x - b)) - 1
    SignedSigmoid,
    /// 1 / (1 + exp(-a·x - b))
    UnsignedSigmoid,
    /// tanh(a·x + b)
    Tanh,
    /// tanh(a·x³ + b)
    TanhCubic,
    /// 1 if x + b > 0, else -1
    SignedStep,
    /// 1 if x + b > 0, else 0
    UnsignedStep,
    /// 2·exp(-(a·(x - b))²) - 1
    SignedGauss,
    /// exp(-(a·(x - b))²)
    UnsignedGauss,
    /// |x + b|
    Abs,
    /// sin(a·x + b)
    SignedSine,
    /// (sin(a·x + b) + 1) / 2
    UnsignedSine,
    /// x + b
    Linear,
    /// max(0, x)
    Relu,
    /// ln(1 + exp(x))
    Softplus,
}

impl ActivationFunction {
    /// Every tag, in the order matched by
    /// [`Parameters::activation_function_probs`].
    ///
    /// [`Parameters::activation_function_probs`]: crate::Parameters::activation_function_probs
    pub const ALL: [ActivationFunction; 14] = [
        ActivationFunction::SignedSigmoid,
        ActivationFunction::UnsignedSigmoid,
        ActivationFunction::Tanh,
        ActivationFunction::TanhCubic,
        ActivationFunction::SignedStep,
        ActivationFunction::UnsignedStep,
        ActivationFunction::SignedGauss,
        ActivationFunction::UnsignedGauss,
        ActivationFunction::Abs,
        ActivationFunction::SignedSine,
        ActivationFunction::UnsignedSine,
        ActivationFunction::Linear,
        ActivationFunction::Relu,
        ActivationFunction::Softplus,
    ];

    /// Evaluates the function at `x` with shape parameters `a` and `b`.
    pub fn apply(self, x: f64, a: f64, b: f64) -> f64 {
        match self {
            ActivationFunction::SignedSigmoid => 2.0 / (1.0 + (-a * x - b).exp()) - 1.0,
            ActivationFunction::UnsignedSigmoid => 1.0 / (1.0 + (-a * x - b).exp()),
            ActivationFunction::Tanh => (a * x + b).tanh(),
            ActivationFunction::TanhCubic => (a * x.powi(3) + b).tanh(),
            ActivationFunction::SignedStep => {
                if x + b > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            ActivationFunction::UnsignedStep => {
                if x + b > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationFunction::SignedGauss => 2.0 * (-(a * (x - b)).powi(2)).exp() - 1.0,
            ActivationFunction::UnsignedGauss => (-(a * (x - b)).powi(2)).exp(),
            ActivationFunction::Abs => (x + b).abs(),
            ActivationFunction::SignedSine => (a * x + b).sin(),
            ActivationFunction::UnsignedSine => ((a * x + b).sin() + 1.0) / 2.0,
            ActivationFunction::Linear => x + b,
            ActivationFunction::Relu => x.max(0.0),
            ActivationFunction::Softplus => (1.0 + x.exp()).ln(),
        }
    }
}

/// A neuron gene: the genotype of a single network node.
///
/// The shape parameters travel with the gene: `a` and `b` feed the
/// activation formula, while `time_constant` and `bias` only matter
/// under leaky activation. `split_y` is the neuron's normalized depth
/// in `[0, 1]`, used for recurrence classification and layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuronGene {
    id: NeuronId,
    neuron_type: NeuronType,
    activation: ActivationFunction,
    a: f64,
    b: f64,
    time_constant: f64,
    bias: f64,
    split_y: f64,
    pub(crate) traits: TraitMap,
}

impl NeuronGene {
    /// Returns a new neuron gene with neutral shape parameters
    /// (`a = 1`, `b = 0`, `time_constant = 1`, `bias = 0`).
    pub fn new(
        id: NeuronId,
        neuron_type: NeuronType,
        activation: ActivationFunction,
        split_y: f64,
    ) -> NeuronGene {
        NeuronGene {
            id,
            neuron_type,
            activation,
            a: 1.0,
            b: 0.0,
            time_constant: 1.0,
            bias: 0.0,
            split_y,
            traits: TraitMap::new(),
        }
    }

    /// Sets all four shape parameters at once.
    pub fn init_shape(&mut self, a: f64, b: f64, time_constant: f64, bias: f64) {
        self.a = a;
        self.b = b;
        self.time_constant = time_constant;
        self.bias = bias;
    }

    pub fn id(&self) -> NeuronId {
        self.id
    }

    pub fn neuron_type(&self) -> NeuronType {
        self.neuron_type
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    pub(crate) fn set_activation(&mut self, activation: ActivationFunction) {
        self.activation = activation;
    }

    /// Slope/gain parameter of the activation function.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Shift parameter of the activation function.
    pub fn b(&self) -> f64 {
        self.b
    }

    pub(crate) fn set_a(&mut self, a: f64) {
        self.a = a;
    }

    pub(crate) fn set_b(&mut self, b: f64) {
        self.b = b;
    }

    /// Time constant used by leaky activation.
    pub fn time_constant(&self) -> f64 {
        self.time_constant
    }

    pub(crate) fn set_time_constant(&mut self, time_constant: f64) {
        self.time_constant = time_constant;
    }

    /// Constant input used by leaky activation.
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub(crate) fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    /// Normalized depth within the network, in `[0, 1]`.
    /// Inputs sit at 0.0, outputs at 1.0, split neurons in between.
    pub fn split_y(&self) -> f64 {
        self.split_y
    }

    /// The neuron's trait map. Never interpreted by the engine.
    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }
}

impl fmt::Display for NeuronGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{:?}, {:?}, y: {:.2}]",
            self.id, self.neuron_type, self.activation, self.split_y,
        )
    }
}
