use super::WEIGHT_LIMIT;
use cogverse_data::{BehaviorTraits, Brain, Genome};
use rand::Rng;

/// Largest perturbation a single mutation can apply to a weight or bias.
pub const MUTATION_AMOUNT: f32 = 0.3;
/// Largest perturbation applied to a behavior trait.
pub const TRAIT_MUTATION_AMOUNT: f64 = 0.1;

/// Bounded, bell-shaped noise in `[-amount, amount]`: the mean of three uniforms.
fn bounded_noise<R: Rng>(amount: f32, rng: &mut R) -> f32 {
    let sum: f32 = (0..3).map(|_| rng.gen_range(-amount..=amount)).sum();
    sum / 3.0
}

/// Perturbs every weight and bias independently with probability `rate`.
pub fn mutate_with_rng<R: Rng>(brain: &mut Brain, rate: f64, rng: &mut R) {
    if rate <= 0.0 {
        return;
    }
    for layer in &mut brain.layers {
        for w in layer.weights.iter_mut().chain(layer.biases.iter_mut()) {
            if rng.gen_bool(rate.min(1.0)) {
                *w = (*w + bounded_noise(MUTATION_AMOUNT, rng)).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
            }
        }
    }
}

pub fn mutate_traits<R: Rng>(traits: &mut BehaviorTraits, rate: f64, rng: &mut R) {
    if rate <= 0.0 {
        return;
    }
    let mut values = traits.as_array();
    for v in &mut values {
        if rng.gen_bool(rate.min(1.0)) {
            let noise = f64::from(bounded_noise(TRAIT_MUTATION_AMOUNT as f32, rng));
            *v = (*v + noise).clamp(0.0, 1.0);
        }
    }
    *traits = BehaviorTraits::from_array(values);
}

/// Deep copy of `parent` with independent perturbations.
pub fn offspring_genome<R: Rng>(parent: &Genome, rate: f64, rng: &mut R) -> Genome {
    let mut child = parent.clone();
    mutate_with_rng(&mut child.brain, rate, rng);
    mutate_traits(&mut child.traits, rate, rng);
    child
}
