use crate::common::kf1d::KF1D;
use crate::selfdrive::car::values::VehicleProfile;

/// Measurement deviation beyond which the filter is re-seeded instead of
/// filtered, preventing a slow re-convergence (and a large phantom
/// acceleration) when the vehicle is already moving at startup.
pub const V_EGO_RESET_DELTA: f64 = 2.0; // m/s

/// Filtered speed at or below which the vehicle is judged stationary.
pub const STANDSTILL_SPEED: f64 = 0.001; // m/s

/// One cycle's velocity estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityEstimate {
    /// Unfiltered mean wheel speed.
    pub v_raw: f64,
    /// Filtered longitudinal velocity.
    pub v_ego: f64,
    /// Filtered longitudinal acceleration.
    pub a_ego: f64,
    /// Vehicle judged stationary via the filtered velocity.
    pub standstill: bool,
}

/// Fuses the four wheel speeds into a smoothed velocity/acceleration pair
/// using a fixed-gain Kalman filter.
///
/// # Examples
///
/// ```rust
/// use carpilot::selfdrive::car::values::VehicleProfile;
/// use carpilot::selfdrive::car::velocity::VelocityFilter;
///
/// let profile = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap();
/// let mut filter = VelocityFilter::new(&profile);
///
/// let estimate = filter.update([10.0, 10.0, 10.0, 10.0]);
/// // Startup at speed trips the reset, so the first output is exact.
/// assert_eq!(estimate.v_ego, 10.0);
/// assert!(!estimate.standstill);
/// ```
#[derive(Debug, Clone)]
pub struct VelocityFilter {
    kf: KF1D,
}

impl VelocityFilter {
    /// Creates a new `VelocityFilter` using the profile's filter constants.
    pub fn new(profile: &VehicleProfile) -> Self {
        let dt = profile.kf_dt;
        VelocityFilter {
            kf: KF1D::new(
                [0.0, 0.0],
                [[1.0, dt], [0.0, 1.0]],
                [1.0, 0.0],
                profile.kf_gain,
            ),
        }
    }

    /// Applies one filter step to the given wheel speeds (m/s).
    ///
    /// # Arguments
    ///
    /// * `wheel_speeds` - The four wheel speeds, already unit-converted.
    ///
    /// # Returns
    ///
    /// The cycle's [`VelocityEstimate`].
    pub fn update(&mut self, wheel_speeds: [f64; 4]) -> VelocityEstimate {
        let v_wheel = wheel_speeds.iter().sum::<f64>() / 4.0;

        let (v_est, _) = self.kf.state();
        if (v_wheel - v_est).abs() > V_EGO_RESET_DELTA {
            log::debug!(
                "velocity filter reset: measurement {:.2} m/s, estimate {:.2} m/s",
                v_wheel,
                v_est
            );
            self.kf.set_state(v_wheel, 0.0);
        }

        let (mut v_ego, a_ego) = self.kf.update(v_wheel);
        let standstill = v_ego <= STANDSTILL_SPEED;
        if standstill && v_ego < 0.0 {
            v_ego = 0.0;
        }

        VelocityEstimate {
            v_raw: v_wheel,
            v_ego,
            a_ego,
            standstill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn filter() -> VelocityFilter {
        let profile = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap();
        VelocityFilter::new(&profile)
    }

    #[test]
    fn test_standstill_at_zero_input() {
        let mut filter = filter();
        let estimate = filter.update([0.0; 4]);
        assert_eq!(estimate.v_ego, 0.0);
        assert!(estimate.standstill);
    }

    #[test]
    fn test_mean_of_four_wheels() {
        let mut filter = filter();
        let estimate = filter.update([9.0, 10.0, 11.0, 10.0]);
        assert_eq!(estimate.v_raw, 10.0);
    }

    #[test]
    fn test_reset_emits_measurement_exactly() {
        let mut filter = filter();
        // 10 m/s deviates from the zero estimate by more than the reset
        // delta, so the state is re-seeded and the output is exact.
        let estimate = filter.update([10.0; 4]);
        assert_eq!(estimate.v_ego, 10.0);
        assert_eq!(estimate.a_ego, 0.0);
        assert!(!estimate.standstill);
    }

    #[test]
    fn test_small_deviation_is_filtered_not_reset() {
        let mut filter = filter();
        let estimate = filter.update([1.5; 4]);
        assert!(estimate.v_ego > 0.0);
        assert!(estimate.v_ego < 1.5);
    }

    #[test]
    fn test_converges_to_sustained_constant_input() {
        let mut filter = filter();
        filter.update([1.0; 4]);
        let mut estimate = filter.update([1.0; 4]);
        for _ in 0..3000 {
            estimate = filter.update([1.0; 4]);
        }
        assert_abs_diff_eq!(estimate.v_ego, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(estimate.a_ego, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_v_ego_never_negative_in_deadband() {
        let mut filter = filter();
        // Drive the estimate around zero with a small negative bias; the
        // standstill deadband must clamp the published velocity at zero.
        filter.update([1.5; 4]);
        for _ in 0..5000 {
            let estimate = filter.update([0.0; 4]);
            if estimate.standstill {
                assert!(estimate.v_ego >= 0.0);
            }
        }
    }
}
