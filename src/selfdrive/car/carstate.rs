use crate::selfdrive::car::signals::SignalTable;
use crate::selfdrive::car::values::{
    AngleSource, CruiseSource, GasSource, Gear, ToggleSource, VehicleProfile,
};
use crate::selfdrive::car::velocity::VelocityFilter;

/// Magnitude both angle readings must exceed before the one-shot
/// steering-angle offset is learned.
const ANGLE_CALIBRATION_MIN: f64 = 1e-3;

/// EPS steering control state decoded from the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerState {
    /// EPS healthy, lateral control not engaged.
    Standby,
    /// EPS healthy and applying commanded torque.
    Active,
    /// EPS reported a state outside the profile's fault-free set.
    Fault,
}

/// Canonical per-cycle vehicle state snapshot.
///
/// Rebuilt from scratch every cycle and immutable once produced; downstream
/// telemetry and the safety-state machine consume it by value.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    /// All four doors closed.
    pub doors_closed: bool,
    /// Driver seatbelt latched.
    pub seatbelt_latched: bool,
    pub brake_pressed: bool,
    /// Gas pedal position from the profile's pedal source.
    pub pedal_gas: f64,
    /// Traction control disabled by the driver.
    pub esp_disabled: bool,
    pub wheel_speed_fl: f64,
    pub wheel_speed_fr: f64,
    pub wheel_speed_rl: f64,
    pub wheel_speed_rr: f64,
    /// Unfiltered mean wheel speed, m/s.
    pub v_ego_raw: f64,
    /// Filtered longitudinal velocity, m/s.
    pub v_ego: f64,
    /// Filtered longitudinal acceleration, m/s².
    pub a_ego: f64,
    pub standstill: bool,
    /// Steering angle, degrees, offset-calibrated where the profile needs it.
    pub angle_steers: f64,
    /// Steering angle rate, degrees per second.
    pub angle_steers_rate: f64,
    pub steer_torque_driver: f64,
    pub steer_torque_motor: f64,
    /// Driver torque exceeds the profile's takeover threshold.
    pub steer_override: bool,
    pub steer_state: SteerState,
    pub steer_error: bool,
    pub gear: Gear,
    /// Adaptive cruise armed by the driver.
    pub main_on: bool,
    pub cruise_active: bool,
    /// Cruise set-speed in the source message's native unit.
    pub cruise_set_speed: f64,
    /// Cruise refuses to engage below its speed floor (only reported by the
    /// secondary PCM cruise source; `false` elsewhere).
    pub low_speed_lockout: bool,
    pub left_blinker_on: bool,
    pub right_blinker_on: bool,
    /// Prior cycle's blinker flags, kept for consumers doing edge detection.
    pub prev_left_blinker_on: bool,
    pub prev_right_blinker_on: bool,
    pub brake_lights: bool,
    /// Platform-specific auxiliary toggle (autopark state or auto high beam).
    pub generic_toggle: bool,
    /// Stock AEB intervention reported on the camera bus.
    pub stock_aeb: bool,
}

/// Builds one [`VehicleState`] per cycle from the decoded signal table.
///
/// Owns the velocity filter and the one-shot steering-angle calibration.
/// Deterministic: the same signal table and internal calibration state always
/// produce the same snapshot.
///
/// # Examples
///
/// ```rust
/// use carpilot::selfdrive::car::carstate::StateEstimator;
/// use carpilot::selfdrive::car::signals::SignalTable;
/// use carpilot::selfdrive::car::values::VehicleProfile;
///
/// let profile = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap();
/// let mut estimator = StateEstimator::new(profile);
///
/// let mut signals = SignalTable::new();
/// signals.set("SEATS_DOORS", "DOOR_OPEN_FL", 0.0);
/// signals.set("SEATS_DOORS", "DOOR_OPEN_FR", 0.0);
/// signals.set("SEATS_DOORS", "DOOR_OPEN_RL", 0.0);
/// signals.set("SEATS_DOORS", "DOOR_OPEN_RR", 0.0);
/// signals.set("SEATS_DOORS", "SEATBELT_DRIVER_UNLATCHED", 0.0);
///
/// let state = estimator.update(&signals);
/// assert!(state.doors_closed && state.seatbelt_latched);
/// assert!(state.standstill);
/// ```
#[derive(Debug)]
pub struct StateEstimator {
    profile: VehicleProfile,
    velocity: VelocityFilter,
    angle_offset: f64,
    angle_offset_locked: bool,
    left_blinker_on: bool,
    right_blinker_on: bool,
}

impl StateEstimator {
    /// Creates a new `StateEstimator` for the given profile.
    ///
    /// All variant dispatch is resolved here; `update` never branches on an
    /// unknown configuration.
    pub fn new(profile: VehicleProfile) -> Self {
        let velocity = VelocityFilter::new(&profile);
        StateEstimator {
            profile,
            velocity,
            angle_offset: 0.0,
            angle_offset_locked: false,
            left_blinker_on: false,
            right_blinker_on: false,
        }
    }

    /// The profile this estimator was constructed with.
    pub fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    /// Consumes one cycle's decoded signals and produces the state snapshot.
    ///
    /// Must run exactly once per control cycle: the blinker edge memory and
    /// the velocity filter advance with every call.
    pub fn update(&mut self, signals: &SignalTable) -> VehicleState {
        let prev_left_blinker_on = self.left_blinker_on;
        let prev_right_blinker_on = self.right_blinker_on;

        // Doors default open and the seatbelt defaults unlatched, the safe
        // reading when the message has not arrived yet.
        let doors_closed = !(signals.get_bool("SEATS_DOORS", "DOOR_OPEN_FL", true)
            || signals.get_bool("SEATS_DOORS", "DOOR_OPEN_FR", true)
            || signals.get_bool("SEATS_DOORS", "DOOR_OPEN_RL", true)
            || signals.get_bool("SEATS_DOORS", "DOOR_OPEN_RR", true));
        let seatbelt_latched = !signals.get_bool("SEATS_DOORS", "SEATBELT_DRIVER_UNLATCHED", true);

        let brake_pressed = signals.get_bool("BRAKE_MODULE", "BRAKE_PRESSED", false);
        let esp_disabled = signals.get_bool("ESP_CONTROL", "TC_DISABLED", true);

        let pedal_gas = match self.profile.gas_source {
            GasSource::Pedal => signals.get("GAS_PEDAL", "GAS_PEDAL", 0.0),
            GasSource::PedalAlt => signals.get("GAS_PEDAL_ALT", "GAS_PEDAL", 0.0),
            GasSource::Interceptor => {
                (signals.get("GAS_SENSOR", "INTERCEPTOR_GAS", 0.0)
                    + signals.get("GAS_SENSOR", "INTERCEPTOR_GAS2", 0.0))
                    / 2.0
            }
        };

        let ws = self.profile.wheel_speed_factor;
        let wheel_speed_fl = signals.get("WHEEL_SPEEDS", "WHEEL_SPEED_FL", 0.0) * ws;
        let wheel_speed_fr = signals.get("WHEEL_SPEEDS", "WHEEL_SPEED_FR", 0.0) * ws;
        let wheel_speed_rl = signals.get("WHEEL_SPEEDS", "WHEEL_SPEED_RL", 0.0) * ws;
        let wheel_speed_rr = signals.get("WHEEL_SPEEDS", "WHEEL_SPEED_RR", 0.0) * ws;
        let estimate = self.velocity.update([
            wheel_speed_fl,
            wheel_speed_fr,
            wheel_speed_rl,
            wheel_speed_rr,
        ]);

        let angle_steers = self.derive_angle_steers(signals);
        let angle_steers_rate = signals.get("STEER_ANGLE_SENSOR", "STEER_RATE", 0.0);

        let gear = self
            .profile
            .parse_gear(signals.get("GEAR_PACKET", "GEAR", 0.0) as u8);

        let (main_on, cruise_set_speed, low_speed_lockout) = match self.profile.cruise_source {
            CruiseSource::Dsu => (
                signals.get_bool("DSU_CRUISE", "MAIN_ON", false),
                signals.get("DSU_CRUISE", "SET_SPEED", 0.0),
                false,
            ),
            CruiseSource::PcmAlt => (
                signals.get_bool("PCM_CRUISE_ALT", "MAIN_ON", false),
                signals.get("PCM_CRUISE_ALT", "SET_SPEED", 0.0),
                false,
            ),
            CruiseSource::Pcm2 => (
                signals.get_bool("PCM_CRUISE_2", "MAIN_ON", false),
                signals.get("PCM_CRUISE_2", "SET_SPEED", 0.0),
                signals.get("PCM_CRUISE_2", "LOW_SPEED_LOCKOUT", 0.0) == 2.0,
            ),
        };

        // Lever code 3 means no blinker; it is also the stale default.
        let turn_signals = signals.get("STEERING_LEVERS", "TURN_SIGNALS", 3.0);
        self.left_blinker_on = turn_signals == 1.0;
        self.right_blinker_on = turn_signals == 2.0;

        let lka_state = signals.get("EPS_STATUS", "LKA_STATE", 0.0) as u8;
        let steer_error = !self.profile.ok_steer_states.contains(&lka_state);
        let steer_state = if steer_error {
            SteerState::Fault
        } else if lka_state == 5 {
            SteerState::Active
        } else {
            SteerState::Standby
        };

        let steer_torque_driver = signals.get("STEER_TORQUE_SENSOR", "STEER_TORQUE_DRIVER", 0.0);
        let steer_torque_motor = signals.get("STEER_TORQUE_SENSOR", "STEER_TORQUE_EPS", 0.0);
        let steer_override = steer_torque_driver.abs() > self.profile.override_threshold;

        let mut cruise_active = signals.get_bool("PCM_CRUISE", "CRUISE_ACTIVE", false);
        let brake_lights =
            signals.get_bool("ESP_CONTROL", "BRAKE_LIGHTS_ACC", false) || brake_pressed;

        let generic_toggle = match self.profile.toggle_source {
            ToggleSource::AutoparkState => signals.get("AUTOPARK_STATUS", "STATE", 0.0) != 0.0,
            ToggleSource::LightStalk => signals.get_bool("LIGHT_STALK", "AUTO_HIGH_BEAM", false),
            ToggleSource::LightStalkAlt => {
                signals.get_bool("LIGHT_STALK_ISH", "AUTO_HIGH_BEAM", false)
            }
        };

        let stock_aeb = signals.get_bool("PRE_COLLISION", "PRECOLLISION_ACTIVE", false)
            && signals.get("PRE_COLLISION", "FORCE", 0.0) < -1e-5;

        // The stock cruise status signal is unreliable on some platforms;
        // once the driver has armed the system, re-derive the active flag
        // from gear/seatbelt/door gating instead.
        if self.profile.stock_cruise_unreliable && generic_toggle && main_on {
            cruise_active = gear == Gear::Drive && seatbelt_latched && doors_closed;
        }

        VehicleState {
            doors_closed,
            seatbelt_latched,
            brake_pressed,
            pedal_gas,
            esp_disabled,
            wheel_speed_fl,
            wheel_speed_fr,
            wheel_speed_rl,
            wheel_speed_rr,
            v_ego_raw: estimate.v_raw,
            v_ego: estimate.v_ego,
            a_ego: estimate.a_ego,
            standstill: estimate.standstill,
            angle_steers,
            angle_steers_rate,
            steer_torque_driver,
            steer_torque_motor,
            steer_override,
            steer_state,
            steer_error,
            gear,
            main_on,
            cruise_active,
            cruise_set_speed,
            low_speed_lockout,
            left_blinker_on: self.left_blinker_on,
            right_blinker_on: self.right_blinker_on,
            prev_left_blinker_on,
            prev_right_blinker_on,
            brake_lights,
            generic_toggle,
            stock_aeb,
        }
    }

    /// Steering angle per the profile's source, applying the one-shot
    /// power-up offset calibration where the platform needs it.
    fn derive_angle_steers(&mut self, signals: &SignalTable) -> f64 {
        match self.profile.angle_source {
            AngleSource::DedicatedSensor => {
                signals.get("STEER_ANGLE_SENSOR", "STEER_ANGLE", 0.0)
                    + signals.get("STEER_ANGLE_SENSOR", "STEER_FRACTION", 0.0)
            }
            AngleSource::TorqueSensor => signals.get("STEER_TORQUE_SENSOR", "STEER_ANGLE", 0.0),
            AngleSource::TorqueSensorCalibrated => {
                // The torque-sensor angle is zeroed to wherever the wheel sat
                // at power-up. Learn the offset against the dedicated sensor
                // the first cycle both readings are live, then freeze it.
                let angle_steers =
                    signals.get("STEER_TORQUE_SENSOR", "STEER_ANGLE", 0.0) - self.angle_offset;
                let angle_wheel = signals.get("STEER_ANGLE_SENSOR", "STEER_ANGLE", 0.0)
                    + signals.get("STEER_ANGLE_SENSOR", "STEER_FRACTION", 0.0);
                if !self.angle_offset_locked
                    && angle_wheel.abs() > ANGLE_CALIBRATION_MIN
                    && angle_steers.abs() > ANGLE_CALIBRATION_MIN
                {
                    self.angle_offset_locked = true;
                    self.angle_offset = angle_steers - angle_wheel;
                    log::info!("steering angle offset calibrated: {:.3} deg", self.angle_offset);
                }
                angle_steers
            }
        }
    }
}
