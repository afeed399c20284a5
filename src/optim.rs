use crate::engine::ComputationGraph;
use daggy::NodeIndex;
use num_traits::Float;
use std::fmt;

/// Plain gradient descent: `p += -learning_rate * grad(p)`.
#[derive(Copy, Clone, Debug)]
pub struct Sgd<T> {
    pub learning_rate: T,
}

impl<T> Sgd<T>
where
    T: Float + fmt::Display,
{
    pub fn new(learning_rate: T) -> Self {
        Self { learning_rate }
    }

    /// Must run before every backward pass, otherwise gradients from the
    /// previous pass are added on top of the new ones.
    pub fn zero_grad(&self, cg: &mut ComputationGraph<T>, params: &[NodeIndex]) {
        for &p in params {
            cg.zero_grad(p);
        }
    }

    pub fn step(&self, cg: &mut ComputationGraph<T>, params: &[NodeIndex]) {
        for &p in params {
            let data = cg.data(p) + -self.learning_rate * cg.grad(p);
            cg.set_data(p, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_moves_against_gradient() {
        let mut cg = ComputationGraph::<f64>::new();
        let w = cg.new_value(1.0);
        let x = cg.new_value(3.0);
        let y = cg.mul(w, x);
        cg.backward(y);

        let sgd = Sgd::new(0.5);
        sgd.step(&mut cg, &[w]);
        assert_eq!(cg.data(w), -0.5);
        assert_eq!(cg.data(x), 3.0);

        sgd.zero_grad(&mut cg, &[w]);
        assert_eq!(cg.grad(w), 0.0);
        assert_eq!(cg.grad(x), 1.0);
    }
}
