use polyneat::genomics::{ActivationFunction, Genome};
use polyneat::populations::Population;
use polyneat::{Parameters, RandomSource};

use rayon::prelude::*;

const MAX_GENERATIONS: usize = 150;
const TARGET_FITNESS: f64 = 15.0;
const RUNS: u64 = 10;

fn evaluate_xor(genome: &Genome) -> f64 {
    let mut network = genome.build_phenotype();

    let cases = [
        ([0.0, 0.0, 1.0], 0.0),
        ([0.0, 1.0, 1.0], 1.0),
        ([1.0, 0.0, 1.0], 1.0),
        ([1.0, 1.0, 1.0], 0.0),
    ];

    let mut error = 0.0;
    for (input, expected) in cases {
        network.flush();
        network.load_inputs(&input);
        for _ in 0..4 {
            network.activate();
        }
        error += (network.outputs()[0] - expected).abs();
    }

    (4.0 - error).powi(2)
}

fn xor_parameters() -> Parameters {
    Parameters {
        population_size: 150,
        dynamic_compatibility: true,
        normalize_genome_size: true,
        weight_diff_coeff: 0.1,
        compat_threshold: 2.0,
        young_age_threshold: 15,
        species_max_stagnation: 15,
        old_age_threshold: 35,
        min_species: 2,
        max_species: 10,
        roulette_wheel_selection: false,
        recurrent_prob: 0.0,
        recurrent_loop_prob: 0.0,
        allow_loops: false,
        overall_mutation_rate: 1.0,
        mutate_weights_prob: 0.9,
        weight_mutation_max_power: 0.5,
        weight_replacement_max_power: 1.0,
        mutate_weights_severe_prob: 0.0,
        weight_mutation_rate: 0.25,
        weight_replacement_rate: 0.1,
        max_weight: 8.0,
        mutate_add_neuron_prob: 0.01,
        mutate_add_link_prob: 0.3,
        mutate_rem_link_prob: 0.0,
        min_activation_a: 4.9,
        max_activation_a: 4.9,
        activation_unsigned_sigmoid_prob: 1.0,
        crossover_rate: 0.7,
        multipoint_crossover_rate: 0.4,
        survival_rate: 0.2,
        ..Parameters::defaults()
    }
}

/// Runs one seeded evolution; returns the generation that solved XOR,
/// if any, and the best fitness reached.
fn run(seed: u64) -> (Option<usize>, f64) {
    let params = xor_parameters();
    let mut rng = RandomSource::seeded(seed);
    // 2 logic inputs + the bias input, 1 output.
    let prototype = Genome::new(
        0,
        3,
        1,
        ActivationFunction::UnsignedSigmoid,
        &params,
        &mut rng,
    );
    let mut population =
        Population::new(prototype, params, seed).expect("parameters are valid");

    for generation in 0..MAX_GENERATIONS {
        // Fitness evaluation is the parallel stage: score read-only
        // snapshots on the rayon pool, then write results back.
        let fitnesses: Vec<f64> = population
            .genomes()
            .cloned()
            .collect::<Vec<_>>()
            .par_iter()
            .map(evaluate_xor)
            .collect();
        for (genome, fitness) in population.genomes_mut().zip(&fitnesses) {
            genome.set_fitness(*fitness);
            genome.set_evaluated();
        }

        let champion = population.champion();
        let (hidden, links) = champion.complexity();
        println!(
            "seed {:>2} gen {:>3}/{}: best {:>8.4}, complexity ({}, {}), {} species",
            seed,
            generation,
            MAX_GENERATIONS - 1,
            champion.fitness(),
            hidden,
            links,
            population.species().count(),
        );

        if champion.fitness() > TARGET_FITNESS {
            println!(
                "solved; champion: {}",
                ron::to_string(champion).expect("genome serializes")
            );
            return (Some(generation), champion.fitness());
        }

        if let Err(e) = population.epoch() {
            eprintln!("seed {}: {}", seed, e);
            break;
        }
    }

    (None, population.best_genome().fitness())
}

fn main() {
    let mut solved = Vec::new();
    let mut failed = 0;
    for seed in 0..RUNS {
        match run(seed) {
            (Some(generation), _) => solved.push(generation),
            (None, best) => {
                failed += 1;
                eprintln!("seed {} did not solve XOR (best {:.4})", seed, best);
            }
        }
    }

    if solved.is_empty() {
        println!("no run solved XOR");
    } else {
        println!(
            "solved {}/{} runs, mean generations {:.1}",
            solved.len(),
            RUNS,
            solved.iter().sum::<usize>() as f64 / solved.len() as f64,
        );
    }
    if failed > 0 {
        println!("{} runs hit the generation limit", failed);
    }
}
