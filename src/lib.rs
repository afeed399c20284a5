//! Scalar reverse-mode automatic differentiation with a small multilayer
//! perceptron on top.
//!
//! Every value lives in a [`ComputationGraph`] arena and is addressed by a
//! [`NodeIndex`]. Operators append new nodes; [`ComputationGraph::backward`]
//! walks the graph in reverse topological order and accumulates gradients
//! into every node the root depends on.
//!
//! ```
//! use gradnet::ComputationGraph;
//!
//! let mut cg = ComputationGraph::<f64>::new();
//! let x = cg.new_value(3.0);
//! let y = cg.mul(x, x);
//! cg.backward(y);
//! assert_eq!(cg.grad(x), 6.0);
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod loss;
pub mod nn;
pub mod optim;
pub mod train;

pub use daggy::NodeIndex;

pub use crate::config::TrainConfig;
pub use crate::engine::{ComputationGraph, Op, Value};
pub use crate::error::{Error, Result};
pub use crate::loss::mse;
pub use crate::nn::{Layer, Module, Neuron, MLP};
pub use crate::optim::Sgd;
pub use crate::train::Trainer;
