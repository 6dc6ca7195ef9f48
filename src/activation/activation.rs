use std::f64::consts::E;

/// Logistic sigmoid, the activation used by every layer past the input.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + E.powf(-x))
}

/// Derivative of the sigmoid written in terms of its own output,
/// `σ'(z) = σ(z)·(1 − σ(z))`, which is what back-propagation has on hand.
pub fn sigmoid_slope(output: f64) -> f64 {
    output * (1.0 - output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_of_zero_is_half() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid_slope(sigmoid(0.0)), 0.25);
    }

    #[test]
    fn sigmoid_saturates() {
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }
}
