//! The fixed geometric layout used by HyperNEAT's indirect encoding.
//!
//! A substrate places input, hidden and output nodes at 2-D or 3-D
//! coordinates and declares which directed layer pairs a CPPN may
//! connect. It is immutable once evolution starts and is shared
//! read-only across all genomes of a run.

use crate::genomics::ActivationFunction;

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// A geometric node layout plus connectivity permissions.
///
/// Construct with [`Substrate::new`], then adjust the public
/// permission flags and decoding knobs before evolution begins:
///
/// ```
/// use polyneat::substrate::Substrate;
///
/// let mut substrate = Substrate::new(
///     vec![vec![-1.0, -1.0], vec![-1.0, 0.0], vec![-1.0, 1.0]],
///     vec![vec![0.0, -1.0], vec![0.0, 0.0], vec![0.0, 1.0]],
///     vec![vec![1.0, 0.0]],
/// ).unwrap();
/// substrate.allow_input_hidden_links = true;
/// substrate.allow_hidden_output_links = true;
/// substrate.with_distance = true;
/// substrate.max_weight_and_bias = 8.0;
///
/// // 2 coordinates per endpoint, the distance term, and the 1.0 bias.
/// assert_eq!(substrate.min_cppn_inputs(), 2 * 2 + 1 + 1);
/// assert_eq!(substrate.min_cppn_outputs(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    inputs: Vec<Vec<f64>>,
    hidden: Vec<Vec<f64>>,
    outputs: Vec<Vec<f64>>,
    dimensions: usize,

    pub allow_input_hidden_links: bool,
    pub allow_input_output_links: bool,
    pub allow_hidden_hidden_links: bool,
    pub allow_hidden_output_links: bool,
    pub allow_output_hidden_links: bool,
    pub allow_output_output_links: bool,
    pub allow_looped_hidden_links: bool,
    pub allow_looped_output_links: bool,

    /// Activation function given to decoded hidden nodes.
    pub hidden_activation: ActivationFunction,
    /// Activation function given to decoded output nodes.
    pub output_activation: ActivationFunction,

    /// Feed the Euclidean distance between the queried pair as an
    /// extra CPPN input.
    pub with_distance: bool,
    /// Scale of decoded connection weights.
    pub max_weight_and_bias: f64,
    /// Minimum CPPN output magnitude that produces a connection, in
    /// `[0, 1)`. Outputs below it decode to no connection at all.
    pub link_threshold: f64,
}

impl Substrate {
    /// Creates a substrate from coordinate lists. All points must
    /// share one dimensionality of 2 or 3; the hidden list may be
    /// empty. Permission flags start at the conservative
    /// input→hidden→output feed-forward sandwich.
    ///
    /// # Errors
    /// Returns an error on mixed or unsupported dimensionalities, or
    /// when the input or output list is empty.
    pub fn new(
        inputs: Vec<Vec<f64>>,
        hidden: Vec<Vec<f64>>,
        outputs: Vec<Vec<f64>>,
    ) -> Result<Substrate, SubstrateError> {
        if inputs.is_empty() || outputs.is_empty() {
            return Err(SubstrateError::MissingLayer);
        }
        let dimensions = inputs[0].len();
        if !(2..=3).contains(&dimensions) {
            return Err(SubstrateError::UnsupportedDimension(dimensions));
        }
        if inputs
            .iter()
            .chain(hidden.iter())
            .chain(outputs.iter())
            .any(|point| point.len() != dimensions)
        {
            return Err(SubstrateError::MixedDimensions);
        }
        Ok(Substrate {
            inputs,
            hidden,
            outputs,
            dimensions,
            allow_input_hidden_links: true,
            allow_input_output_links: false,
            allow_hidden_hidden_links: false,
            allow_hidden_output_links: true,
            allow_output_hidden_links: false,
            allow_output_output_links: false,
            allow_looped_hidden_links: false,
            allow_looped_output_links: false,
            hidden_activation: ActivationFunction::SignedSigmoid,
            output_activation: ActivationFunction::UnsignedSigmoid,
            with_distance: false,
            max_weight_and_bias: 8.0,
            link_threshold: 0.2,
        })
    }

    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    pub fn hidden(&self) -> &[Vec<f64>] {
        &self.hidden
    }

    pub fn outputs(&self) -> &[Vec<f64>] {
        &self.outputs
    }

    /// Coordinate dimensionality: 2 or 3.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of inputs a genome must have to act as this substrate's
    /// CPPN: both endpoints' coordinates, the optional distance term,
    /// and a constant 1.0.
    pub fn min_cppn_inputs(&self) -> usize {
        2 * self.dimensions + usize::from(self.with_distance) + 1
    }

    /// Number of outputs a CPPN genome must provide. The first output
    /// is read as the connection weight.
    pub fn min_cppn_outputs(&self) -> usize {
        1
    }
}

/// An invalid substrate geometry, reported at construction.
#[derive(Debug, PartialEq, Eq)]
pub enum SubstrateError {
    /// The input or output coordinate list is empty.
    MissingLayer,
    /// Points of differing dimensionality were mixed.
    MixedDimensions,
    /// Coordinates are neither 2-D nor 3-D.
    UnsupportedDimension(usize),
}

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLayer => write!(f, "substrate requires input and output coordinates"),
            Self::MixedDimensions => {
                write!(f, "substrate coordinates mix dimensionalities")
            }
            Self::UnsupportedDimension(d) => {
                write!(f, "substrate coordinates must be 2-D or 3-D, got {}-D", d)
            }
        }
    }
}

impl Error for SubstrateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ActivationFunction, Genome, LinkGene, PhenotypeError};
    use crate::{Parameters, RandomSource};

    fn xor_substrate() -> Substrate {
        let mut substrate = Substrate::new(
            vec![vec![-1.0, -1.0], vec![-1.0, 0.0], vec![-1.0, 1.0]],
            vec![vec![0.0, -1.0], vec![0.0, 0.0], vec![0.0, 1.0]],
            vec![vec![1.0, 0.0]],
        )
        .unwrap();
        substrate.allow_input_hidden_links = true;
        substrate.allow_hidden_output_links = true;
        substrate
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let result = Substrate::new(
            vec![vec![-1.0, -1.0]],
            vec![],
            vec![vec![1.0, 0.0, 0.0]],
        );
        assert_eq!(result.unwrap_err(), SubstrateError::MixedDimensions);
    }

    #[test]
    fn rejects_one_dimensional_points() {
        let result = Substrate::new(vec![vec![-1.0]], vec![], vec![vec![1.0]]);
        assert_eq!(result.unwrap_err(), SubstrateError::UnsupportedDimension(1));
    }

    #[test]
    fn cppn_arity_tracks_distance_flag() {
        let mut substrate = xor_substrate();
        assert_eq!(substrate.min_cppn_inputs(), 5);
        substrate.with_distance = true;
        assert_eq!(substrate.min_cppn_inputs(), 6);
    }

    #[test]
    fn mismatched_cppn_is_a_build_error() {
        let substrate = xor_substrate();
        let params = Parameters::defaults();
        let mut rng = RandomSource::seeded(0);
        // 3 inputs instead of the required 5.
        let genome =
            Genome::new(7, 3, 1, ActivationFunction::Tanh, &params, &mut rng);
        assert_eq!(
            genome.build_hyperneat_phenotype(&substrate).unwrap_err(),
            PhenotypeError::CppnInputMismatch {
                genome: 7,
                expected: 5,
                actual: 3,
            }
        );
    }

    #[test]
    fn decoding_respects_threshold_and_scaling() {
        let substrate = xor_substrate();
        let params = Parameters::defaults();
        let mut rng = RandomSource::seeded(0);

        // A CPPN that always outputs 0: no connection clears the
        // threshold, so the phenotype is connectionless.
        let silent = Genome::unconnected(
            0,
            substrate.min_cppn_inputs(),
            1,
            ActivationFunction::Linear,
            &params,
            &mut rng,
        );
        let network = silent.build_hyperneat_phenotype(&substrate).unwrap();
        assert_eq!(network.connection_count(), 0);
        assert_eq!(network.neuron_count(), 3 + 3 + 1);

        // A CPPN wired from its constant-1.0 input with weight 1.0
        // outputs 1.0 for every pair: every permitted pair connects at
        // full strength.
        let mut constant = Genome::unconnected(
            1,
            substrate.min_cppn_inputs(),
            1,
            ActivationFunction::Linear,
            &params,
            &mut rng,
        );
        // The bias input is the last input neuron (id 4 of 0..=4).
        constant
            .add_link(LinkGene::new(0, 4, 5, 1.0, false))
            .unwrap();
        let network = constant.build_hyperneat_phenotype(&substrate).unwrap();
        // input->hidden (3 x 3) plus hidden->output (3 x 1).
        assert_eq!(network.connection_count(), 9 + 3);
    }

    #[test]
    fn decoded_network_activates() {
        let substrate = xor_substrate();
        let params = Parameters::defaults();
        let mut rng = RandomSource::seeded(3);
        let mut cppn = Genome::unconnected(
            0,
            substrate.min_cppn_inputs(),
            1,
            ActivationFunction::Linear,
            &params,
            &mut rng,
        );
        cppn.add_link(LinkGene::new(0, 4, 5, 0.5, false)).unwrap();

        let mut network = cppn.build_hyperneat_phenotype(&substrate).unwrap();
        network.load_inputs(&[1.0, 0.0, 1.0]);
        network.activate();
        network.activate();
        assert_eq!(network.outputs().len(), 1);
        assert!(network.outputs()[0].is_finite());
    }
}
