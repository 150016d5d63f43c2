/// 2PL response model shared by the estimator and the selector.
use crate::constants::PROBABILITY_FLOOR;
use crate::types::Item;

/// Logistic function, split by sign so `exp` never overflows.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

/// P(high response | theta) = 1 / (1 + exp(-a (theta - b))), clamped away from 0 and 1.
#[inline]
pub fn probability(item: &Item, theta: f64) -> f64 {
    let p = sigmoid(item.discrimination * (theta - item.difficulty));
    p.clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR)
}

/// Fisher information of one item at theta: a^2 P (1 - P).
#[inline]
pub fn fisher_information(item: &Item, theta: f64) -> f64 {
    let p = probability(item, theta);
    item.discrimination * item.discrimination * p * (1.0 - p)
}
