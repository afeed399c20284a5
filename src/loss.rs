use crate::{
    engine::{from_f64, ComputationGraph},
    error::{Error, Result},
};
use daggy::NodeIndex;
use num_traits::Float;
use std::fmt;

/// Mean squared error, `(1/n) * sum((pred_i - target_i)^2)`, built from graph
/// operators so `backward` reaches every node feeding the predictions.
pub fn mse<T>(
    cg: &mut ComputationGraph<T>,
    predictions: &[NodeIndex],
    targets: &[NodeIndex],
) -> Result<NodeIndex>
where
    T: Float + fmt::Display,
{
    if predictions.len() != targets.len() {
        return Err(Error::LengthMismatch {
            predictions: predictions.len(),
            targets: targets.len(),
        });
    }
    if predictions.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let mut sum = cg.new_value(T::zero());
    for (&pred, &target) in predictions.iter().zip(targets) {
        let diff = cg.sub(pred, target);
        let two = cg.new_value(from_f64(2.0));
        let squared = cg.pow(diff, two);
        sum = cg.add(sum, squared);
    }

    let n = cg.new_value(from_f64(predictions.len() as f64));
    Ok(cg.div(sum, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_prediction_is_zero() {
        let mut cg = ComputationGraph::<f64>::new();
        let preds = cg.new_values(&[1.0, -2.5, 3.0]);
        let targets = cg.new_values(&[1.0, -2.5, 3.0]);
        let loss = mse(&mut cg, &preds, &targets).unwrap();
        assert_eq!(cg.data(loss), 0.0);
    }

    #[test]
    fn value_and_gradients() {
        let mut cg = ComputationGraph::<f64>::new();
        let preds = cg.new_values(&[1.0, 2.0]);
        let targets = cg.new_values(&[3.0, 2.5]);
        let loss = mse(&mut cg, &preds, &targets).unwrap();
        // ((-2)^2 + (-0.5)^2) / 2
        assert!((cg.data(loss) - 2.125).abs() < 1e-12);

        cg.backward(loss);
        // d/dp_i = 2 * (p_i - t_i) / n
        assert!((cg.grad(preds[0]) + 2.0).abs() < 1e-12);
        assert!((cg.grad(preds[1]) + 0.5).abs() < 1e-12);
        assert!((cg.grad(targets[0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let mut cg = ComputationGraph::<f64>::new();
        let preds = cg.new_values(&[1.0, 2.0]);
        let targets = cg.new_values(&[1.0]);
        assert!(matches!(
            mse(&mut cg, &preds, &targets),
            Err(Error::LengthMismatch {
                predictions: 2,
                targets: 1
            })
        ));
    }

    #[test]
    fn empty_batch_is_an_error() {
        let mut cg = ComputationGraph::<f64>::new();
        assert!(matches!(mse(&mut cg, &[], &[]), Err(Error::EmptyBatch)));
    }
}
