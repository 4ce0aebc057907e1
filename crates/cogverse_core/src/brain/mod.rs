pub mod mutation;

use crate::config::NeuralNetworkConfig;
pub use cogverse_data::{Activation, Brain, Layer};
use cogverse_data::data::genome::logistic;
use rand::Rng;

/// Weights are kept inside this band after learning and mutation.
pub const WEIGHT_LIMIT: f32 = 5.0;

/// Values computed by one forward pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activations {
    pub outputs: Vec<f32>,
    /// Activations of the last hidden layer (the inputs of the output layer).
    pub last_hidden: Vec<f32>,
}

/// Trait defining the core logic for the agents' feed-forward networks.
pub trait BrainLogic {
    fn new_random_with_rng<R: Rng>(config: &NeuralNetworkConfig, rng: &mut R) -> Self;

    /// Runs the network. Missing inputs read as zero, extra inputs are ignored
    /// and non-finite inputs are zeroed.
    #[must_use]
    fn forward(&self, inputs: &[f32]) -> Activations;

    /// Nudges the output weights of `output` by `learning_rate * reward * hidden`.
    fn reinforce(
        &mut self,
        activations: &Activations,
        output: usize,
        reward: f32,
        learning_rate: f32,
    );

    fn mutate_with_rng<R: Rng>(&mut self, rate: f64, rng: &mut R);

    fn mean_abs_weight(&self) -> f64;

    /// Connection count times mean absolute weight.
    fn complexity(&self) -> f64;
}

impl BrainLogic for Brain {
    fn new_random_with_rng<R: Rng>(config: &NeuralNetworkConfig, rng: &mut R) -> Self {
        let mut sizes = Vec::with_capacity(config.hidden_sizes.len() + 2);
        sizes.push(config.input_size);
        sizes.extend(config.hidden_sizes.iter().copied());
        sizes.push(config.output_size);

        let layers = sizes
            .windows(2)
            .map(|pair| {
                let (inputs, outputs) = (pair[0], pair[1]);
                let mut layer = Layer::zeroed(inputs, outputs);
                let limit = (6.0 / (inputs + outputs).max(1) as f32).sqrt();
                for w in &mut layer.weights {
                    *w = rng.gen_range(-limit..=limit);
                }
                layer
            })
            .collect();

        Brain {
            layers,
            activation: config.activation,
        }
    }

    fn forward(&self, inputs: &[f32]) -> Activations {
        let mut current: Vec<f32> = (0..self.input_size())
            .map(|i| match inputs.get(i) {
                Some(v) if v.is_finite() => *v,
                _ => 0.0,
            })
            .collect();
        let mut last_hidden = current.clone();

        let depth = self.layers.len();
        for (l, layer) in self.layers.iter().enumerate() {
            let is_output = l + 1 == depth;
            if is_output {
                last_hidden = current.clone();
            }
            let next: Vec<f32> = (0..layer.outputs)
                .map(|o| {
                    let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                    let sum = row
                        .iter()
                        .zip(current.iter())
                        .fold(layer.biases[o], |acc, (w, x)| acc + w * x);
                    if is_output {
                        logistic(sum)
                    } else {
                        self.activation.apply(sum)
                    }
                })
                .collect();
            current = next;
        }

        Activations {
            outputs: current,
            last_hidden,
        }
    }

    fn reinforce(
        &mut self,
        activations: &Activations,
        output: usize,
        reward: f32,
        learning_rate: f32,
    ) {
        let Some(layer) = self.layers.last_mut() else {
            return;
        };
        if output >= layer.outputs || !reward.is_finite() {
            return;
        }
        let row = &mut layer.weights[output * layer.inputs..(output + 1) * layer.inputs];
        for (w, h) in row.iter_mut().zip(activations.last_hidden.iter()) {
            *w = (*w + learning_rate * reward * h).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
        }
    }

    fn mutate_with_rng<R: Rng>(&mut self, rate: f64, rng: &mut R) {
        mutation::mutate_with_rng(self, rate, rng);
    }

    fn mean_abs_weight(&self) -> f64 {
        let count = self.connection_count();
        if count == 0 {
            return 0.0;
        }
        let total: f64 = self
            .layers
            .iter()
            .flat_map(|l| l.weights.iter())
            .map(|w| f64::from(w.abs()))
            .sum();
        total / count as f64
    }

    fn complexity(&self) -> f64 {
        self.connection_count() as f64 * self.mean_abs_weight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn brain(seed: u64) -> Brain {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Brain::new_random_with_rng(&NeuralNetworkConfig::default(), &mut rng)
    }

    #[test]
    fn test_topology_follows_config() {
        let b = brain(1);
        assert_eq!(b.layers.len(), 3);
        assert_eq!(b.input_size(), 20);
        assert_eq!(b.output_size(), 8);
        assert_eq!(b.connection_count(), 20 * 32 + 32 * 16 + 16 * 8);
    }

    #[test]
    fn test_xavier_bounds() {
        let b = brain(2);
        let limit = (6.0f32 / 52.0).sqrt();
        assert!(b.layers[0].weights.iter().all(|w| w.abs() <= limit));
        assert!(b.layers[0].biases.iter().all(|&bias| bias == 0.0));
    }

    #[test]
    fn test_forward_outputs_are_probabilities() {
        let b = brain(3);
        let act = b.forward(&[0.5; 20]);
        assert_eq!(act.outputs.len(), 8);
        assert_eq!(act.last_hidden.len(), 16);
        assert!(act.outputs.iter().all(|o| (0.0..=1.0).contains(o)));
    }

    #[test]
    fn test_forward_pads_and_sanitizes_inputs() {
        let b = brain(4);
        let mut padded = vec![0.3, f32::NAN];
        padded.resize(20, 0.0);
        let mut sanitized = vec![0.3, 0.0];
        sanitized.resize(20, 0.0);
        assert_eq!(b.forward(&[0.3, f32::NAN]), b.forward(&sanitized));
        assert_eq!(b.forward(&padded), b.forward(&sanitized));
    }

    #[test]
    fn test_reinforce_moves_chosen_output() {
        let mut b = brain(5);
        let inputs = [0.8; 20];
        let before = b.forward(&inputs);
        b.reinforce(&before, 2, 1.0, 0.5);
        let after = b.forward(&inputs);
        let moved = after.outputs[2] - before.outputs[2];
        let hidden_energy: f32 = before.last_hidden.iter().map(|h| h * h).sum();
        if hidden_energy > 0.0 {
            assert!(moved > 0.0);
        }
        assert_eq!(after.outputs[3], before.outputs[3]);
    }

    #[test]
    fn test_complexity_is_connections_times_mean_weight() {
        let b = brain(6);
        let expected = b.connection_count() as f64 * b.mean_abs_weight();
        assert!((b.complexity() - expected).abs() < 1e-9);
        assert!(b.complexity() > 0.0);
    }
}
