/**
This module computes the F1 score of true positive, false positive and false negative counts, and
the mean and standard deviation of F1 scores across annotator pairs.
*/
use crate::tensor::PAIR_AXIS;
use ndarray::{prelude::*, RemoveAxis, ScalarOperand};
use num::Float;
use std::fmt::Debug;

/// Internal extension trait for Num's Float trait
pub trait FloatExt: Float + Send + Sync + Clone + ScalarOperand + Debug {}

impl<T: Float + Send + Sync + Clone + Copy + ScalarOperand + Debug> FloatExt for T {}

/// Divides `numerator` by `denominator`, returning NaN when the denominator is zero. A zero
/// denominator means that neither annotator annotated anything.
#[inline(always)]
fn f1_divide<F: FloatExt>(numerator: F, denominator: F) -> F {
    if denominator.is_zero() {
        F::nan()
    } else {
        numerator / denominator
    }
}

/// Computes the F1 score, i.e. `2·tp / (2·tp + fp + fn)`. Returns NaN if all the counts are zero.
///
/// ```rust
/// use rusiaa::compute_f1;
///
/// assert_eq!(compute_f1(1.0, 1.0, 1.0), 0.5);
/// assert!(compute_f1(0.0_f64, 0.0, 0.0).is_nan());
/// ```
pub fn compute_f1<F: FloatExt>(tp: F, fp: F, fn_: F) -> F {
    let two = F::one() + F::one();
    f1_divide(two * tp, two * tp + fp + fn_)
}

/// Mean and standard deviation of an array, one value per remaining cell.
pub type MeanSd<D> = (Array<f64, D>, Array<f64, D>);

/// Mean and population standard deviation along the pair axis. NaN scores propagate to the mean
/// and standard deviation of their cell.
pub(crate) fn mean_sd<D: RemoveAxis>(f1_pairs: ArrayView<f64, D>) -> MeanSd<D::Smaller> {
    let num_pairs = f1_pairs.len_of(PAIR_AXIS) as f64;
    let mean = f1_pairs.sum_axis(PAIR_AXIS) / num_pairs;
    let sd = f1_pairs.std_axis(PAIR_AXIS, 0.0);
    (mean, sd)
}
