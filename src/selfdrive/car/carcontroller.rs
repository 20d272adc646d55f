use crate::selfdrive::car::carstate::VehicleState;
use crate::selfdrive::car::values::{SteerLimits, VehicleProfile};

/// Length of the turn-signal steering suppression window, in cycles.
pub const TURN_SIGNAL_SUPPRESS_CYCLES: u32 = 100;

/// Minimum cycles between two resume button pulses at standstill.
pub const RESUME_PULSE_MIN_GAP: u64 = 5;

/// Rolling counters wrap modulo 16 (4 bits on the wire).
const ROLLING_COUNTER_MODULUS: u8 = 16;

/// HUD alert requested by the upstream planner, carried verbatim into the
/// steering frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudAlert {
    None,
    Steer,
    SteerRequired,
}

impl HudAlert {
    /// Wire code of the alert.
    pub fn code(self) -> u8 {
        match self {
            HudAlert::None => 0,
            HudAlert::Steer => 1,
            HudAlert::SteerRequired => 2,
        }
    }
}

/// Cruise button codes understood by the stock cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonCode {
    ResumeAccel,
    Cancel,
}

impl ButtonCode {
    /// Wire code of the button.
    pub fn code(self) -> u8 {
        match self {
            ButtonCode::ResumeAccel => 1,
            ButtonCode::Cancel => 4,
        }
    }
}

/// Desired actuation for one cycle, supplied by the upstream planner and
/// safety-state machine. Whether the system should be enabled is decided
/// there, never here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationCommand {
    /// Desired normalized steer in `[-1, 1]`.
    pub steer: f64,
    pub enabled: bool,
    /// Request a cruise cancel button pulse this cycle.
    pub cancel: bool,
    pub hud_alert: HudAlert,
}

/// One outgoing actuation frame; the wire-level byte layout belongs to the
/// external encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutgoingFrame {
    /// Steering command, emitted every cycle.
    Steering {
        /// Applied torque after rate and bound limiting.
        torque: i32,
        /// EPS asked to act on the torque.
        steer_req: bool,
        counter: u8,
        hud_alert: HudAlert,
        enabled: bool,
    },
    /// Cruise button pulse (cancel or resume).
    Button { button: ButtonCode, counter: u8 },
}

/// Bounds a desired steering torque by the rate limits and the driver's
/// measured torque.
///
/// Driver torque widens the allowed band in the direction the driver pushes
/// and shrinks it in the other, so the system backs off instead of fighting
/// a takeover. Steps toward center are allowed to be larger than steps away
/// from it.
///
/// # Arguments
///
/// * `desired` - Requested torque before limiting.
/// * `last` - Torque applied on the previous cycle.
/// * `driver_torque` - Measured driver torque this cycle.
/// * `limits` - The profile's rate limiter parameters.
///
/// # Returns
///
/// The bounded torque, always within `[-steer_max, steer_max]` and within
/// the per-cycle step limits of `last`.
///
/// # Examples
///
/// ```rust
/// use carpilot::selfdrive::car::carcontroller::apply_steer_torque_limits;
/// use carpilot::selfdrive::car::values::VehicleProfile;
///
/// let limits = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap().steer_limits;
/// let applied = apply_steer_torque_limits(1000.0, 0.0, 0.0, &limits);
/// assert_eq!(applied, limits.steer_delta_up);
/// ```
pub fn apply_steer_torque_limits(
    desired: f64,
    last: f64,
    driver_torque: f64,
    limits: &SteerLimits,
) -> f64 {
    // Band allowed by the driver's torque.
    let driver_max = limits.steer_max
        + (limits.steer_driver_allowance + driver_torque * limits.steer_driver_factor)
            * limits.steer_driver_multiplier;
    let driver_min = -limits.steer_max
        + (-limits.steer_driver_allowance + driver_torque * limits.steer_driver_factor)
            * limits.steer_driver_multiplier;
    let max_allowed = limits.steer_max.min(driver_max).max(0.0);
    let min_allowed = (-limits.steer_max).max(driver_min).min(0.0);

    let bounded = desired.clamp(min_allowed, max_allowed);

    // Slow the rate when torque magnitude grows, allow faster unwinding.
    if last > 0.0 {
        bounded.clamp(
            (last - limits.steer_delta_down).max(-limits.steer_delta_up),
            last + limits.steer_delta_up,
        )
    } else {
        bounded.clamp(
            last - limits.steer_delta_up,
            (last + limits.steer_delta_down).min(limits.steer_delta_up),
        )
    }
}

/// Turns a desired actuation command into a bounded, framed output list.
///
/// Owns every piece of mutable actuation state: the previous applied torque
/// for rate limiting, two independent rolling counters, the resume pulse
/// pacing, and the turn-signal suppression countdown. Exactly one instance
/// per vehicle session; all mutation happens inside [`update`].
///
/// [`update`]: ActuationController::update
///
/// # Examples
///
/// ```rust
/// use carpilot::selfdrive::car::carcontroller::{
///     ActuationCommand, ActuationController, HudAlert, OutgoingFrame,
/// };
/// use carpilot::selfdrive::car::carstate::StateEstimator;
/// use carpilot::selfdrive::car::signals::SignalTable;
/// use carpilot::selfdrive::car::values::VehicleProfile;
///
/// let profile = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap();
/// let mut estimator = StateEstimator::new(profile.clone());
/// let mut controller = ActuationController::new(profile);
///
/// let state = estimator.update(&SignalTable::new());
/// let command = ActuationCommand {
///     steer: 0.5,
///     enabled: true,
///     cancel: false,
///     hud_alert: HudAlert::None,
/// };
/// let frames = controller.update(&state, 0, &command);
/// assert!(matches!(frames[0], OutgoingFrame::Steering { .. }));
/// ```
#[derive(Debug)]
pub struct ActuationController {
    profile: VehicleProfile,
    apply_steer_last: f64,
    steer_rate_limited: bool,
    steer_counter: u8,
    button_counter: u8,
    last_resume_cycle: Option<u64>,
    turn_signal_timer: u32,
    // Low-rate administrative flags, written by an external poller between
    // cycles and read synchronously here. Never fetched on the hot path.
    signal_triggered_disable: bool,
    lat_control_allowed: bool,
}

impl ActuationController {
    /// Creates a new `ActuationController` for the given profile.
    pub fn new(profile: VehicleProfile) -> Self {
        ActuationController {
            profile,
            apply_steer_last: 0.0,
            steer_rate_limited: false,
            steer_counter: 0,
            button_counter: 0,
            last_resume_cycle: None,
            turn_signal_timer: 0,
            signal_triggered_disable: false,
            lat_control_allowed: true,
        }
    }

    /// Whether the last cycle's target was cut by the rate limiter.
    pub fn steer_rate_limited(&self) -> bool {
        self.steer_rate_limited
    }

    /// Enables or disables the blinker-triggered steering suppression mode.
    ///
    /// Cached flag; the low-rate configuration poller writes it between
    /// cycles.
    pub fn set_signal_triggered_disable(&mut self, on: bool) {
        self.signal_triggered_disable = on;
    }

    /// Global lateral-control kill switch. While `false`, the steer-request
    /// bit is never set, though torque keeps being computed and limited.
    ///
    /// Cached flag; the low-rate configuration poller writes it between
    /// cycles.
    pub fn set_lat_control_allowed(&mut self, allowed: bool) {
        self.lat_control_allowed = allowed;
    }

    /// Synthesizes this cycle's outgoing frames from the vehicle state and
    /// the desired actuation.
    ///
    /// Must run exactly once per control cycle. Output order is fixed:
    /// cancel button frame (if any), steering frame, resume button frame
    /// (if any).
    ///
    /// # Arguments
    ///
    /// * `state` - This cycle's vehicle state snapshot.
    /// * `cycle` - Monotonic cycle index from the caller's cadence.
    /// * `command` - Desired actuation from the upstream planner.
    pub fn update(
        &mut self,
        state: &VehicleState,
        cycle: u64,
        command: &ActuationCommand,
    ) -> Vec<OutgoingFrame> {
        let limits = &self.profile.steer_limits;

        let target = command.steer * limits.steer_max;
        let mut apply_steer = apply_steer_torque_limits(
            target,
            self.apply_steer_last,
            state.steer_torque_driver,
            limits,
        );
        self.steer_rate_limited = target != apply_steer;

        if !command.enabled {
            apply_steer = 0.0;
        }
        let mut steer_req = command.enabled;

        if command.enabled
            && (state.left_blinker_on || state.right_blinker_on)
            && self.signal_triggered_disable
        {
            if self.turn_signal_timer == 0 {
                log::debug!("turn signal active, suppressing steer request");
            }
            self.turn_signal_timer = TURN_SIGNAL_SUPPRESS_CYCLES;
        }

        // The window decrements every cycle, whatever the blinker does
        // mid-window.
        if self.turn_signal_timer > 0 {
            self.turn_signal_timer -= 1;
            steer_req = false;
        }

        if !self.lat_control_allowed {
            steer_req = false;
        }

        self.apply_steer_last = apply_steer;

        let mut frames = Vec::with_capacity(3);

        if command.cancel {
            frames.push(OutgoingFrame::Button {
                button: ButtonCode::Cancel,
                counter: self.button_counter,
            });
        }

        frames.push(OutgoingFrame::Steering {
            torque: apply_steer.round() as i32,
            steer_req,
            counter: self.steer_counter,
            hud_alert: command.hud_alert,
            enabled: command.enabled,
        });

        if !command.cancel && state.standstill && self.resume_gap_elapsed(cycle) {
            self.last_resume_cycle = Some(cycle);
            frames.push(OutgoingFrame::Button {
                button: ButtonCode::ResumeAccel,
                counter: self.button_counter,
            });
        }

        // Both counters advance every cycle so the receiver can detect
        // dropped frames of either message type.
        self.steer_counter = (self.steer_counter + 1) % ROLLING_COUNTER_MODULUS;
        self.button_counter = (self.button_counter + 1) % ROLLING_COUNTER_MODULUS;

        frames
    }

    fn resume_gap_elapsed(&self, cycle: u64) -> bool {
        match self.last_resume_cycle {
            Some(last) => cycle.saturating_sub(last) >= RESUME_PULSE_MIN_GAP,
            None => true,
        }
    }
}
