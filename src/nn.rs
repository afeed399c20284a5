use crate::{
    engine::{from_f64, ComputationGraph},
    error::{Error, Result},
};
use daggy::NodeIndex;
use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt;

/// Anything holding trainable leaves.
pub trait Module {
    /// Trainable leaves in a fixed order, so optimizer steps are reproducible.
    fn parameters(&self) -> Vec<NodeIndex>;
}

// nin = # of weights
#[derive(Clone, Debug)]
pub struct Neuron {
    weights: Vec<NodeIndex>,
    b: NodeIndex,
    non_lin: bool,
}

impl Neuron {
    /// Weights are drawn from N(0, sqrt(2 / nin)), the bias starts at zero.
    pub fn new<T, R>(
        cg: &mut ComputationGraph<T>,
        rng: &mut R,
        nin: usize,
        non_lin: bool,
    ) -> Result<Self>
    where
        T: Float + fmt::Display,
        R: Rng + ?Sized,
    {
        if nin == 0 {
            return Err(Error::InvalidArchitecture(
                "a neuron needs at least one input".to_string(),
            ));
        }
        let std_dev = (2.0 / nin as f64).sqrt();
        let between = Normal::new(0.0, std_dev).map_err(|e| Error::Init(e.to_string()))?;

        let weights = (0..nin)
            .map(|_| cg.new_value(from_f64(between.sample(&mut *rng))))
            .collect();
        let b = cg.new_value(T::zero());

        Ok(Self {
            weights,
            b,
            non_lin,
        })
    }

    /// Builds a neuron around existing leaves.
    pub fn from_parts(weights: Vec<NodeIndex>, b: NodeIndex, non_lin: bool) -> Self {
        Self {
            weights,
            b,
            non_lin,
        }
    }

    pub fn nin(&self) -> usize {
        self.weights.len()
    }

    pub fn is_non_lin(&self) -> bool {
        self.non_lin
    }

    /// `relu(b + sum(w_i * x_i))`, or the bare sum for a linear neuron.
    pub fn forward<T>(&self, cg: &mut ComputationGraph<T>, x: &[NodeIndex]) -> Result<NodeIndex>
    where
        T: Float + fmt::Display,
    {
        if x.len() != self.weights.len() {
            return Err(Error::ShapeMismatch {
                expected: self.weights.len(),
                got: x.len(),
            });
        }

        let activation = self
            .weights
            .iter()
            .zip(x)
            .fold(self.b, |acc, (&w_i, &x_i)| {
                let wx = cg.mul(w_i, x_i);
                cg.add(acc, wx)
            });

        Ok(match self.non_lin {
            true => cg.relu(activation),
            false => activation,
        })
    }
}

impl Module for Neuron {
    fn parameters(&self) -> Vec<NodeIndex> {
        let mut params = self.weights.clone();
        params.push(self.b);
        params
    }
}

// nout = # of neurons
#[derive(Clone, Debug)]
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new<T, R>(
        cg: &mut ComputationGraph<T>,
        rng: &mut R,
        nin: usize,
        nout: usize,
        non_lin: bool,
    ) -> Result<Self>
    where
        T: Float + fmt::Display,
        R: Rng + ?Sized,
    {
        if nout == 0 {
            return Err(Error::InvalidArchitecture(
                "a layer needs at least one neuron".to_string(),
            ));
        }
        let neurons = (0..nout)
            .map(|_| Neuron::new(&mut *cg, &mut *rng, nin, non_lin))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { neurons })
    }

    /// All neurons must share the same input width.
    pub fn from_neurons(neurons: Vec<Neuron>) -> Result<Self> {
        let Some(first) = neurons.first() else {
            return Err(Error::InvalidArchitecture(
                "a layer needs at least one neuron".to_string(),
            ));
        };
        let nin = first.nin();
        if let Some(odd) = neurons.iter().find(|n| n.nin() != nin) {
            return Err(Error::InvalidArchitecture(format!(
                "neurons in one layer take {} and {} inputs",
                nin,
                odd.nin()
            )));
        }
        Ok(Self { neurons })
    }

    pub fn nin(&self) -> usize {
        self.neurons.first().map_or(0, Neuron::nin)
    }

    pub fn nout(&self) -> usize {
        self.neurons.len()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn forward<T>(
        &self,
        cg: &mut ComputationGraph<T>,
        x: &[NodeIndex],
    ) -> Result<Vec<NodeIndex>>
    where
        T: Float + fmt::Display,
    {
        self.neurons.iter().map(|n| n.forward(cg, x)).collect()
    }
}

impl Module for Layer {
    fn parameters(&self) -> Vec<NodeIndex> {
        self.neurons.iter().flat_map(Neuron::parameters).collect()
    }
}

/// Feed-forward stack of layers. Every layer but the last applies ReLU.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug)]
pub struct MLP {
    sizes: Vec<usize>,
    layers: Vec<Layer>,
}

impl MLP {
    /// `nouts` lists the width of every layer, output layer included.
    pub fn new<T, R>(
        cg: &mut ComputationGraph<T>,
        rng: &mut R,
        nin: usize,
        nouts: &[usize],
    ) -> Result<Self>
    where
        T: Float + fmt::Display,
        R: Rng + ?Sized,
    {
        if nouts.is_empty() {
            return Err(Error::InvalidArchitecture(
                "a network needs at least one layer".to_string(),
            ));
        }
        let sizes: Vec<usize> = std::iter::once(nin).chain(nouts.iter().copied()).collect();
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, w)| Layer::new(&mut *cg, &mut *rng, w[0], w[1], i != nouts.len() - 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { sizes, layers })
    }

    /// Chains prebuilt layers, checking that each layer's input width matches
    /// the previous layer's output width.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        let Some(first) = layers.first() else {
            return Err(Error::InvalidArchitecture(
                "a network needs at least one layer".to_string(),
            ));
        };
        let mut sizes = vec![first.nin()];
        for (i, layer) in layers.iter().enumerate() {
            let expected = sizes[i];
            if layer.nin() != expected {
                return Err(Error::InvalidArchitecture(format!(
                    "layer {} takes {} inputs but receives {}",
                    i,
                    layer.nin(),
                    expected
                )));
            }
            sizes.push(layer.nout());
        }
        Ok(Self { sizes, layers })
    }

    /// Input width followed by every layer width.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn forward<T>(
        &self,
        cg: &mut ComputationGraph<T>,
        x: &[NodeIndex],
    ) -> Result<Vec<NodeIndex>>
    where
        T: Float + fmt::Display,
    {
        let mut activations = x.to_vec();
        for layer in &self.layers {
            activations = layer.forward(cg, &activations)?;
        }
        Ok(activations)
    }
}

impl Module for MLP {
    fn parameters(&self) -> Vec<NodeIndex> {
        self.layers.iter().flat_map(Layer::parameters).collect()
    }
}
