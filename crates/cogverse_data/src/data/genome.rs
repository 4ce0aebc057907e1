use serde::{Deserialize, Serialize};

/// Hidden-layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    Relu,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => logistic(x),
            Activation::Relu => x.max(0.0),
        }
    }
}

#[inline]
pub fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer. `weights` is row-major: one row of `inputs`
/// weights per output neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl Layer {
    pub fn zeroed(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            weights: vec![0.0; inputs * outputs],
            biases: vec![0.0; outputs],
        }
    }

    #[inline]
    pub fn weight(&self, output: usize, input: usize) -> f32 {
        self.weights[output * self.inputs + input]
    }
}

/// Feed-forward policy network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub layers: Vec<Layer>,
    pub activation: Activation,
}

impl Brain {
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    pub fn connection_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len()).sum()
    }
}

/// Heritable behavioral dispositions, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorTraits {
    pub exploration: f64,
    pub cooperation: f64,
    pub curiosity: f64,
    pub sociability: f64,
}

impl Default for BehaviorTraits {
    fn default() -> Self {
        Self {
            exploration: 0.5,
            cooperation: 0.5,
            curiosity: 0.5,
            sociability: 0.5,
        }
    }
}

impl BehaviorTraits {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.exploration,
            self.cooperation,
            self.curiosity,
            self.sociability,
        ]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            exploration: values[0],
            cooperation: values[1],
            curiosity: values[2],
            sociability: values[3],
        }
    }
}

/// Everything an agent passes on to its offspring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub brain: Brain,
    pub traits: BehaviorTraits,
}
