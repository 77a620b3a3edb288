use crate::{Innovation, NeuronId};

use std::error::Error;
use std::fmt;

/// An error raised when a gene being added to a genome is invalid.
#[derive(Debug)]
pub enum GeneValidityError {
    /// A link with this innovation id already exists.
    DuplicateInnovation(Innovation),
    /// A link between these endpoints already exists.
    DuplicateEndpoints(NeuronId, NeuronId),
    /// One or both endpoints are missing from the genome.
    NonexistentEndpoints(NeuronId, NeuronId),
    /// The link targets an input or bias neuron.
    InputEndpoint(NeuronId),
    /// A neuron with this id already exists.
    DuplicateNeuron(NeuronId),
}

impl fmt::Display for GeneValidityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateInnovation(id) => {
                write!(f, "link insertion with duplicate innovation id {}", id)
            }
            Self::DuplicateEndpoints(from, to) => {
                write!(f, "link insertion shadows existing link {} -> {}", from, to)
            }
            Self::NonexistentEndpoints(from, to) => {
                write!(f, "link insertion between nonexistent endpoint(s) {} -> {}", from, to)
            }
            Self::InputEndpoint(id) => {
                write!(f, "link insertion targeting input neuron {}", id)
            }
            Self::DuplicateNeuron(id) => {
                write!(f, "neuron insertion with duplicate id {}", id)
            }
        }
    }
}

impl Error for GeneValidityError {}

/// An error raised while building a phenotype from a genome.
///
/// The engine reports these as build failures rather than crashing:
/// the offending genome and the expected arity are named so the caller
/// can diagnose which substrate/genome pairing went wrong.
#[derive(Debug, PartialEq, Eq)]
pub enum PhenotypeError {
    /// The genome's input count does not cover the substrate's
    /// required CPPN inputs.
    CppnInputMismatch {
        genome: usize,
        expected: usize,
        actual: usize,
    },
    /// The genome's output count does not cover the substrate's
    /// required CPPN outputs.
    CppnOutputMismatch {
        genome: usize,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for PhenotypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CppnInputMismatch {
                genome,
                expected,
                actual,
            } => write!(
                f,
                "genome {}: substrate requires {} CPPN inputs, genome has {}",
                genome, expected, actual
            ),
            Self::CppnOutputMismatch {
                genome,
                expected,
                actual,
            } => write!(
                f,
                "genome {}: substrate requires {} CPPN outputs, genome has {}",
                genome, expected, actual
            ),
        }
    }
}

impl Error for PhenotypeError {}
