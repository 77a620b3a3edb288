use crate::genomics::traits::TraitMap;
use crate::{Innovation, NeuronId};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A link gene: a weighted directed connection between two neuron genes.
///
/// Disabled links are retained in the genome rather than deleted, so
/// crossover can still align them by innovation id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkGene {
    innovation: Innovation,
    from: NeuronId,
    to: NeuronId,
    pub(crate) weight: f64,
    pub(crate) enabled: bool,
    recurrent: bool,
    pub(crate) traits: TraitMap,
}

impl LinkGene {
    /// Returns a new enabled link gene.
    pub fn new(
        innovation: Innovation,
        from: NeuronId,
        to: NeuronId,
        weight: f64,
        recurrent: bool,
    ) -> LinkGene {
        LinkGene {
            innovation,
            from,
            to,
            weight,
            enabled: true,
            recurrent,
            traits: TraitMap::new(),
        }
    }

    pub fn innovation(&self) -> Innovation {
        self.innovation
    }

    pub fn from(&self) -> NeuronId {
        self.from
    }

    pub fn to(&self) -> NeuronId {
        self.to
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the link feeds backwards or sideways in depth
    /// (`to.split_y <= from.split_y`), including self-loops.
    pub fn recurrent(&self) -> bool {
        self.recurrent
    }

    /// The link's trait map. Never interpreted by the engine.
    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Adds `delta` to the weight, clamping to `[-bound, bound]`.
    pub(crate) fn perturb_weight(&mut self, delta: f64, bound: f64) {
        self.weight = (self.weight + delta).clamp(-bound, bound);
    }

    /// Replaces the weight, clamping to `[-bound, bound]`.
    pub(crate) fn replace_weight(&mut self, weight: f64, bound: f64) {
        self.weight = weight.clamp(-bound, bound);
    }
}

impl fmt::Display for LinkGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}[{}->{}, {:.3}{}]{}",
            if self.enabled { "" } else { "(" },
            self.innovation,
            self.from,
            self.to,
            self.weight,
            if self.recurrent { ", rec" } else { "" },
            if self.enabled { "" } else { ")" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perturb_clamps_to_bound() {
        let mut gene = LinkGene::new(0, 0, 1, 7.5, false);
        gene.perturb_weight(3.0, 8.0);
        assert_eq!(gene.weight(), 8.0);
        gene.perturb_weight(-20.0, 8.0);
        assert_eq!(gene.weight(), -8.0);
    }

    #[test]
    fn replace_clamps_to_bound() {
        let mut gene = LinkGene::new(0, 0, 1, 0.0, false);
        gene.replace_weight(-11.0, 8.0);
        assert_eq!(gene.weight(), -8.0);
        gene.replace_weight(2.5, 8.0);
        assert_eq!(gene.weight(), 2.5);
    }
}
