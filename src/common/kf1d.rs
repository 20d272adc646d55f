use ndarray::{arr1, arr2, Array1, Array2};

/// Represents a fixed-gain 1D Kalman filter over a `[value, derivative]` state.
///
/// The gain is a precomputed steady-state gain, so the per-update work is one
/// predict+correct step with no runtime covariance propagation:
/// `x ← A·x + K·(z − C·A·x)`. A zero innovation leaves the state untouched,
/// which makes a constant input a fixed point of the filter.
///
/// # Examples
///
/// ```rust
/// use carpilot::common::kf1d::KF1D;
///
/// let dt = 0.01;
/// let mut kf = KF1D::new(
///     [0.0, 0.0],
///     [[1.0, dt], [0.0, 1.0]],
///     [1.0, 0.0],
///     [0.12287673, 0.29666309],
/// );
///
/// let (value, derivative) = kf.update(1.0);
/// assert!(value > 0.0 && derivative > 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct KF1D {
    /// State vector `[value, derivative]`.
    x: Array1<f64>,
    /// State transition matrix.
    a: Array2<f64>,
    /// Observation row vector.
    c: Array1<f64>,
    /// Steady-state Kalman gain.
    k: Array1<f64>,
}

impl KF1D {
    /// Creates a new `KF1D` instance.
    ///
    /// # Arguments
    ///
    /// * `x0` - Initial state `[value, derivative]`.
    /// * `a` - State transition matrix.
    /// * `c` - Observation row vector.
    /// * `k` - Steady-state Kalman gain.
    ///
    /// # Returns
    ///
    /// A new `KF1D` instance.
    pub fn new(x0: [f64; 2], a: [[f64; 2]; 2], c: [f64; 2], k: [f64; 2]) -> Self {
        KF1D {
            x: arr1(&x0),
            a: arr2(&a),
            c: arr1(&c),
            k: arr1(&k),
        }
    }

    /// Applies one predict+correct step for the given scalar measurement.
    ///
    /// # Arguments
    ///
    /// * `meas` - Scalar measurement of the state's first component.
    ///
    /// # Returns
    ///
    /// The updated `(value, derivative)` pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use carpilot::common::kf1d::KF1D;
    ///
    /// let dt = 0.01;
    /// let mut kf = KF1D::new(
    ///     [5.0, 0.0],
    ///     [[1.0, dt], [0.0, 1.0]],
    ///     [1.0, 0.0],
    ///     [0.12287673, 0.29666309],
    /// );
    ///
    /// // A state sitting exactly on the measurement is a fixed point.
    /// let (value, derivative) = kf.update(5.0);
    /// assert_eq!(value, 5.0);
    /// assert_eq!(derivative, 0.0);
    /// ```
    pub fn update(&mut self, meas: f64) -> (f64, f64) {
        let x_pred = self.a.dot(&self.x);
        let innovation = meas - self.c.dot(&x_pred);
        self.x = &x_pred + &(&self.k * innovation);
        (self.x[0], self.x[1])
    }

    /// Returns the current `(value, derivative)` state without filtering.
    pub fn state(&self) -> (f64, f64) {
        (self.x[0], self.x[1])
    }

    /// Overwrites the filter state, bypassing the gain.
    ///
    /// Used to re-seed the filter when the measurement has diverged too far
    /// from the estimate for filtering to converge quickly.
    pub fn set_state(&mut self, value: f64, derivative: f64) {
        self.x = arr1(&[value, derivative]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn v_ego_kf() -> KF1D {
        let dt = 0.01;
        KF1D::new(
            [0.0, 0.0],
            [[1.0, dt], [0.0, 1.0]],
            [1.0, 0.0],
            [0.12287673, 0.29666309],
        )
    }

    #[test]
    fn test_kf1d_creation() {
        let kf = v_ego_kf();
        assert_eq!(kf.state(), (0.0, 0.0));
    }

    #[test]
    fn test_kf1d_first_step_moves_by_gain() {
        let mut kf = v_ego_kf();
        let (value, derivative) = kf.update(1.0);
        assert_abs_diff_eq!(value, 0.12287673, epsilon = 1e-12);
        assert_abs_diff_eq!(derivative, 0.29666309, epsilon = 1e-12);
    }

    #[test]
    fn test_kf1d_converges_to_constant_input() {
        let mut kf = v_ego_kf();
        let mut value = 0.0;
        for _ in 0..2000 {
            let (v, _) = kf.update(12.5);
            value = v;
        }
        assert_abs_diff_eq!(value, 12.5, epsilon = 1e-6);
    }

    #[test]
    fn test_kf1d_fixed_point_after_set_state() {
        let mut kf = v_ego_kf();
        kf.set_state(30.0, 0.0);
        // Zero innovation: the emitted value is the measurement, bit exact.
        let (value, derivative) = kf.update(30.0);
        assert_eq!(value, 30.0);
        assert_eq!(derivative, 0.0);
    }

    #[test]
    fn test_kf1d_stable_over_operating_envelope() {
        let mut kf = v_ego_kf();
        // Sweep the full 0-60 m/s envelope and back; the estimate must track
        // without blowing up.
        for step in 0..12000 {
            let meas = 60.0 * (1.0 - ((step as f64 / 6000.0) - 1.0).abs());
            let (v, a) = kf.update(meas);
            assert!(v.is_finite() && a.is_finite());
            assert!(v >= -1.0 && v <= 61.0);
        }
    }
}
