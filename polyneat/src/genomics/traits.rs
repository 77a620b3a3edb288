//! Arbitrary per-gene and per-genome metadata.
//!
//! Trait maps let downstream consumers attach typed values to neurons,
//! links and whole genomes, and have evolution carry, recombine and
//! mutate them. The engine itself never interprets a trait's value.

use crate::RandomSource;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A trait's value: a closed union of the types
/// evolution knows how to recombine and mutate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TraitValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
}

/// An ordered name → value mapping, attached to neuron genes,
/// link genes and genomes.
pub type TraitMap = BTreeMap<String, TraitValue>;

/// The shape of a single trait: its value domain and
/// the bounds mutation must respect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TraitKind {
    /// A real value in `[min, max]`, perturbed by at most
    /// `mutation_power` per mutation (or redrawn when
    /// `replace_chance` hits).
    Float {
        min: f64,
        max: f64,
        mutation_power: f64,
        replace_chance: f64,
    },
    /// An integer redrawn uniformly from `[min, max]`.
    Int { min: i64, max: i64 },
    /// A flag flipped on mutation.
    Bool,
    /// One of a fixed set of strings, redrawn on mutation.
    Str { options: Vec<String> },
}

/// Per-trait configuration: how the trait is initialized and
/// how often it mutates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitParameters {
    /// Chance this trait mutates when its carrier's trait
    /// mutation fires.
    pub mutation_prob: f64,
    pub kind: TraitKind,
}

/// Draws an initial value for every configured trait.
pub(crate) fn init_traits(
    specs: &BTreeMap<String, TraitParameters>,
    rng: &mut RandomSource,
) -> TraitMap {
    specs
        .iter()
        .map(|(name, spec)| (name.clone(), random_value(&spec.kind, rng)))
        .collect()
}

/// Mutates each trait behind its own probability gate,
/// clamping numeric results to the configured bounds.
pub(crate) fn mutate_traits(
    traits: &mut TraitMap,
    specs: &BTreeMap<String, TraitParameters>,
    rng: &mut RandomSource,
) {
    for (name, spec) in specs {
        if !rng.coin(spec.mutation_prob) {
            continue;
        }
        let value = match traits.get(name) {
            Some(v) => v.clone(),
            None => random_value(&spec.kind, rng),
        };
        let mutated = match (&spec.kind, value) {
            (
                TraitKind::Float {
                    min,
                    max,
                    mutation_power,
                    replace_chance,
                },
                TraitValue::Float(f),
            ) => {
                if rng.coin(*replace_chance) {
                    random_value(&spec.kind, rng)
                } else {
                    TraitValue::Float((f + rng.gauss_signed() * mutation_power).clamp(*min, *max))
                }
            }
            (TraitKind::Bool, TraitValue::Bool(b)) => TraitValue::Bool(!b),
            // Ints and strings are redrawn; a value whose type no longer
            // matches its spec is redrawn as well.
            _ => random_value(&spec.kind, rng),
        };
        traits.insert(name.clone(), mutated);
    }
}

/// Merges two parents' trait maps: each key present in both is taken
/// from a uniformly chosen parent; keys present in one parent only
/// are carried over as-is.
pub(crate) fn mate_traits(a: &TraitMap, b: &TraitMap, rng: &mut RandomSource) -> TraitMap {
    let mut child = TraitMap::new();
    for (name, value) in a {
        let inherited = match b.get(name) {
            Some(other) if rng.coin(0.5) => other.clone(),
            _ => value.clone(),
        };
        child.insert(name.clone(), inherited);
    }
    for (name, value) in b {
        child.entry(name.clone()).or_insert_with(|| value.clone());
    }
    child
}

fn random_value(kind: &TraitKind, rng: &mut RandomSource) -> TraitValue {
    match kind {
        TraitKind::Float { min, max, .. } => {
            TraitValue::Float(min + rng.float() * (max - min))
        }
        TraitKind::Int { min, max } => {
            let span = (max - min).unsigned_abs() as usize;
            TraitValue::Int(min + rng.rand_int(0, span) as i64)
        }
        TraitKind::Bool => TraitValue::Bool(rng.coin(0.5)),
        TraitKind::Str { options } => {
            if options.is_empty() {
                TraitValue::Str(String::new())
            } else {
                TraitValue::Str(options[rng.rand_int(0, options.len() - 1)].clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_spec(min: f64, max: f64) -> TraitParameters {
        TraitParameters {
            mutation_prob: 1.0,
            kind: TraitKind::Float {
                min,
                max,
                mutation_power: 0.5,
                replace_chance: 0.0,
            },
        }
    }

    #[test]
    fn init_respects_bounds() {
        let mut specs = BTreeMap::new();
        specs.insert("gain".to_string(), float_spec(-2.0, 2.0));
        specs.insert(
            "mode".to_string(),
            TraitParameters {
                mutation_prob: 1.0,
                kind: TraitKind::Str {
                    options: vec!["fast".into(), "slow".into()],
                },
            },
        );

        let mut rng = RandomSource::seeded(5);
        let traits = init_traits(&specs, &mut rng);

        match traits.get("gain") {
            Some(TraitValue::Float(f)) => assert!((-2.0..=2.0).contains(f)),
            other => panic!("unexpected gain value: {:?}", other),
        }
        match traits.get("mode") {
            Some(TraitValue::Str(s)) => assert!(s == "fast" || s == "slow"),
            other => panic!("unexpected mode value: {:?}", other),
        }
    }

    #[test]
    fn mutation_clamps_floats() {
        let mut specs = BTreeMap::new();
        specs.insert("gain".to_string(), float_spec(0.0, 1.0));

        let mut rng = RandomSource::seeded(17);
        let mut traits = init_traits(&specs, &mut rng);
        for _ in 0..200 {
            mutate_traits(&mut traits, &specs, &mut rng);
            match traits.get("gain") {
                Some(TraitValue::Float(f)) => assert!((0.0..=1.0).contains(f)),
                other => panic!("unexpected gain value: {:?}", other),
            }
        }
    }

    #[test]
    fn mating_takes_each_value_from_a_parent() {
        let mut a = TraitMap::new();
        a.insert("x".to_string(), TraitValue::Int(1));
        let mut b = TraitMap::new();
        b.insert("x".to_string(), TraitValue::Int(2));
        b.insert("only_b".to_string(), TraitValue::Bool(true));

        let mut rng = RandomSource::seeded(23);
        let child = mate_traits(&a, &b, &mut rng);

        match child.get("x") {
            Some(TraitValue::Int(v)) => assert!(*v == 1 || *v == 2),
            other => panic!("unexpected x value: {:?}", other),
        }
        assert_eq!(child.get("only_b"), Some(&TraitValue::Bool(true)));
    }
}
