use crate::{Innovation, NeuronId};

use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};

/// The population-wide ledger of structural innovations.
///
/// Link innovations are keyed by their endpoint pair, neuron-splitting
/// innovations by the innovation id of the split link, so identical
/// structural mutations arising independently anywhere in the population
/// receive the same identifiers. Ids strictly increase at first
/// assignment, which gives the total order crossover uses to align genes.
///
/// The database is owned by its `Population` and passed by reference
/// into the mutation operators; it is never global state, so multiple
/// independent populations per process stay independent.
///
/// The ledger is append-only for the lifetime of a population.
/// [`reset`] exists for explicit reuse between unrelated runs only.
///
/// [`reset`]: InnovationDatabase::reset
///
/// # Examples
/// ```
/// use polyneat::genomics::InnovationDatabase;
///
/// let mut db = InnovationDatabase::new(3, 1);
///
/// // The same structural mutation always maps to the same id.
/// let id = db.link_innovation(1, 5);
/// assert_eq!(db.link_innovation(1, 5), id);
///
/// // Splitting the same link twice converges to one signature.
/// assert_eq!(db.neuron_innovation(0, false), db.neuron_innovation(0, false));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InnovationDatabase {
    next_innovation: Innovation,
    next_neuron_id: NeuronId,
    link_innovations: HashMap<(NeuronId, NeuronId), Innovation, RandomState>,
    /// Endpoints of every assigned link innovation, indexed by id.
    link_endpoints: Vec<(NeuronId, NeuronId)>,
    neuron_innovations: HashMap<Innovation, (NeuronId, Innovation, Innovation), RandomState>,
}

impl InnovationDatabase {
    /// Creates a database pre-seeded with the numbering of a fully
    /// connected seed genome: neuron ids `0..inputs + outputs`, and the
    /// link between input `i` and output `o` at innovation
    /// `o + i × outputs`.
    pub fn new(input_count: usize, output_count: usize) -> InnovationDatabase {
        let mut link_innovations = HashMap::default();
        let mut link_endpoints = Vec::with_capacity(input_count * output_count);
        for i in 0..input_count {
            for o in 0..output_count {
                link_innovations.insert((i, o + input_count), o + i * output_count);
            }
        }
        for id in 0..input_count * output_count {
            let i = id / output_count;
            let o = id % output_count;
            link_endpoints.push((i, o + input_count));
        }
        InnovationDatabase {
            next_innovation: input_count * output_count,
            next_neuron_id: input_count + output_count,
            link_innovations,
            link_endpoints,
            neuron_innovations: HashMap::default(),
        }
    }

    /// Returns the innovation id for a link between `from` and `to`,
    /// assigning the next free id on first sight. Always succeeds.
    pub fn link_innovation(&mut self, from: NeuronId, to: NeuronId) -> Innovation {
        match self.link_innovations.entry((from, to)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.next_innovation;
                self.next_innovation += 1;
                self.link_endpoints.push((from, to));
                entry.insert(id);
                id
            }
        }
    }

    /// Returns the signature of splitting the link with innovation id
    /// `split_link`: the new neuron's id and the innovation ids of the
    /// two replacement links, as `(neuron, in_link, out_link)`.
    ///
    /// The first split of a link records its signature; later splits of
    /// the same link return the recorded triple, which is what makes
    /// repeated identical splits across the population converge.
    ///
    /// `fresh` forces brand-new numbers (and re-records them) for the
    /// case where the inquiring genome already contains the recorded
    /// neuron, i.e. the same lineage splits the same link twice;
    /// reusing the signature there would duplicate ids inside one
    /// genome.
    ///
    /// # Panics
    /// Panics if `split_link` was never assigned by this database.
    pub fn neuron_innovation(
        &mut self,
        split_link: Innovation,
        fresh: bool,
    ) -> (NeuronId, Innovation, Innovation) {
        if !fresh {
            if let Some(record) = self.neuron_innovations.get(&split_link) {
                return *record;
            }
        }
        let (from, to) = self.link_endpoints[split_link];
        let neuron = self.next_neuron_id;
        self.next_neuron_id += 1;
        let in_link = self.link_innovation(from, neuron);
        let out_link = self.link_innovation(neuron, to);
        self.neuron_innovations
            .insert(split_link, (neuron, in_link, out_link));
        (neuron, in_link, out_link)
    }

    /// Highest link innovation id assigned so far, plus one.
    pub fn next_innovation(&self) -> Innovation {
        self.next_innovation
    }

    /// Next unassigned neuron id.
    pub fn next_neuron_id(&self) -> NeuronId {
        self.next_neuron_id
    }

    /// Iterates the complete link-innovation record as
    /// `((from, to), innovation)`. No ordering is guaranteed.
    pub fn link_innovations(
        &self,
    ) -> impl Iterator<Item = (&(NeuronId, NeuronId), &Innovation)> {
        self.link_innovations.iter()
    }

    /// Clears all records and restarts numbering as if freshly
    /// constructed for the same seed-genome shape.
    ///
    /// Only for reuse between independent runs; never call this while
    /// a population still references the recorded ids.
    pub fn reset(&mut self, input_count: usize, output_count: usize) {
        *self = InnovationDatabase::new(input_count, output_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_numbering_matches_initial_genome() {
        let mut db = InnovationDatabase::new(3, 2);
        for i in 0..3 {
            for o in 0..2 {
                assert_eq!(db.link_innovation(i, o + 3), o + i * 2);
            }
        }
        assert_eq!(db.next_innovation(), 6);
        assert_eq!(db.next_neuron_id(), 5);
    }

    #[test]
    fn link_lookup_is_idempotent() {
        let mut db = InnovationDatabase::new(1, 1);
        let a = db.link_innovation(1, 1);
        let b = db.link_innovation(0, 0);
        assert_eq!(db.link_innovation(1, 1), a);
        assert_eq!(db.link_innovation(0, 0), b);
        assert!(b > a);
    }

    #[test]
    fn ids_strictly_increase_at_first_assignment() {
        let mut db = InnovationDatabase::new(2, 1);
        let first = db.link_innovation(2, 2);
        let second = db.link_innovation(1, 1);
        let third = db.link_innovation(0, 0);
        assert!(first < second && second < third);
    }

    #[test]
    fn same_split_same_signature() {
        let mut db = InnovationDatabase::new(2, 1);
        let first = db.neuron_innovation(0, false);
        let again = db.neuron_innovation(0, false);
        assert_eq!(first, again);

        // A different link splits into a different signature.
        let other = db.neuron_innovation(1, false);
        assert_ne!(first.0, other.0);
    }

    #[test]
    fn fresh_split_takes_new_numbers() {
        let mut db = InnovationDatabase::new(2, 1);
        let first = db.neuron_innovation(0, false);
        let fresh = db.neuron_innovation(0, true);
        assert_ne!(first.0, fresh.0);
        assert_ne!(first.1, fresh.1);
        assert_ne!(first.2, fresh.2);

        // The fresh signature replaces the recorded one.
        assert_eq!(db.neuron_innovation(0, false), fresh);
    }

    #[test]
    fn split_links_connect_through_the_new_neuron() {
        let mut db = InnovationDatabase::new(2, 1);
        // Link 1 runs 1 -> 2 in a 2-input/1-output seeding.
        let (neuron, in_link, out_link) = db.neuron_innovation(1, false);
        assert_eq!(db.link_innovation(1, neuron), in_link);
        assert_eq!(db.link_innovation(neuron, 2), out_link);
    }
}
