use std::error::Error;
use std::fmt;

/// A failure of `Population::epoch`.
#[derive(Debug, PartialEq, Eq)]
pub enum EpochError {
    /// A genome entered the epoch without its fitness assigned: the
    /// external evaluator must evaluate every genome and mark it
    /// evaluated before the epoch runs.
    UnevaluatedGenome { genome: usize, species: usize },
    /// Total adjusted fitness is zero, so no offspring can be
    /// apportioned. Typically every genome scored 0.
    DegeneratePopulation,
}

impl fmt::Display for EpochError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnevaluatedGenome { genome, species } => write!(
                f,
                "epoch requires every genome evaluated; genome {} in species {} is not",
                genome, species
            ),
            Self::DegeneratePopulation => {
                write!(f, "population is degenerate: total adjusted fitness is zero")
            }
        }
    }
}

impl Error for EpochError {}
