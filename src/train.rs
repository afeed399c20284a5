//! Full-batch gradient descent over a loaded dataset.
//!
//! Each step zeroes the parameter gradients, rebuilds the forward graph for
//! every row, reduces it with [`mse`], runs `backward` and applies one SGD
//! update. Everything created during the step is discarded afterwards; only
//! the data leaves and parameters survive.

use crate::{
    config::TrainConfig,
    engine::{from_f64, ComputationGraph},
    error::{Error, Result},
    loss::mse,
    nn::{Module, MLP},
    optim::Sgd,
};
use daggy::NodeIndex;
use num_traits::Float;
use rand::Rng;
use std::fmt;
use tracing::{info, trace};

pub struct Trainer<T>
where
    T: Float + fmt::Display,
{
    cg: ComputationGraph<T>,
    model: MLP,
    params: Vec<NodeIndex>,
    features: Vec<Vec<NodeIndex>>,
    targets: Vec<NodeIndex>,
    optimizer: Sgd<T>,
    // nodes below this index outlive a step
    mark: usize,
}

impl<T> Trainer<T>
where
    T: Float + fmt::Display,
{
    /// `features` and `targets` must already live in `cg`. The input width is
    /// taken from the first feature row.
    pub fn new<R>(
        config: &TrainConfig,
        mut cg: ComputationGraph<T>,
        rng: &mut R,
        features: Vec<Vec<NodeIndex>>,
        targets: Vec<NodeIndex>,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        config.validate()?;
        if features.len() != targets.len() {
            return Err(Error::LengthMismatch {
                predictions: features.len(),
                targets: targets.len(),
            });
        }
        let Some(first) = features.first() else {
            return Err(Error::EmptyBatch);
        };
        let nin = first.len();
        if let Some(row) = features.iter().find(|row| row.len() != nin) {
            return Err(Error::ShapeMismatch {
                expected: nin,
                got: row.len(),
            });
        }

        let model = MLP::new(&mut cg, rng, nin, &config.layer_sizes())?;
        let params = model.parameters();
        let mark = cg.node_count();
        info!(
            rows = features.len(),
            inputs = nin,
            sizes = ?model.sizes(),
            parameters = params.len(),
            "model ready"
        );

        Ok(Self {
            cg,
            model,
            params,
            features,
            targets,
            optimizer: Sgd::new(from_f64(config.learning_rate)),
            mark,
        })
    }

    /// One gradient descent iteration; returns the loss before the update.
    pub fn step(&mut self) -> Result<T> {
        let loss = self.forward_backward();
        if loss.is_ok() {
            self.optimizer.step(&mut self.cg, &self.params);
        }
        self.cg.truncate(self.mark);
        loss
    }

    fn forward_backward(&mut self) -> Result<T> {
        self.optimizer.zero_grad(&mut self.cg, &self.params);

        let mut predictions = Vec::with_capacity(self.features.len());
        for x in &self.features {
            let out = self.model.forward(&mut self.cg, x)?;
            predictions.push(out[0]);
        }

        let loss = mse(&mut self.cg, &predictions, &self.targets)?;
        self.cg.backward(loss);
        Ok(self.cg.data(loss))
    }

    /// Runs `iterations` steps, reporting `(iteration, loss)` after each.
    pub fn fit<F>(&mut self, iterations: usize, mut on_iteration: F) -> Result<Vec<T>>
    where
        F: FnMut(usize, T),
    {
        let mut history = Vec::with_capacity(iterations);
        for k in 0..iterations {
            let loss = self.step()?;
            trace!(iteration = k, loss = %loss, "step");
            on_iteration(k, loss);
            history.push(loss);
        }
        Ok(history)
    }

    /// Network output for one input row, without touching gradients.
    pub fn predict(&mut self, x: &[T]) -> Result<Vec<T>> {
        let inputs = self.cg.new_values(x);
        let out = self
            .model
            .forward(&mut self.cg, &inputs)
            .map(|out| out.iter().map(|&o| self.cg.data(o)).collect());
        self.cg.truncate(self.mark);
        out
    }

    pub fn model(&self) -> &MLP {
        &self.model
    }

    pub fn parameters(&self) -> &[NodeIndex] {
        &self.params
    }

    pub fn graph(&self) -> &ComputationGraph<T> {
        &self.cg
    }
}
