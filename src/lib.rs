//! # carpilot
//!
//! `carpilot` is a Rust crate implementing the per-cycle vehicle-state
//! estimation and actuation-command synthesis of a driver-assistance control
//! loop. It ingests decoded CAN-bus signal values, fuses noisy wheel-speed
//! measurements into a filtered velocity/acceleration estimate, calibrates a
//! steering-angle zero offset, performs per-vehicle-variant signal selection,
//! and derives safety-bounded actuation frames with rate limiting and
//! rolling-counter framing.
//!
//! ## Modules
//!
//! `carpilot` is organized into several modules, each serving a specific purpose:
//!
//! - [KF1D](common/kf1d/struct.KF1D.html): Fixed-gain 1D Kalman filter over a
//!   `[value, derivative]` state.
//!
//! - [VehicleProfile](selfdrive/car/values/struct.VehicleProfile.html): Static
//!   per-model table of signal sources, thresholds and gear tables, resolved
//!   once at session start.
//!
//! - [VelocityFilter](selfdrive/car/velocity/struct.VelocityFilter.html):
//!   Fuses four wheel speeds into a smoothed velocity/acceleration pair.
//!
//! - [StateEstimator](selfdrive/car/carstate/struct.StateEstimator.html):
//!   Builds one immutable [VehicleState](selfdrive/car/carstate/struct.VehicleState.html)
//!   snapshot per cycle and owns the steering-angle calibration.
//!
//! - [ActuationController](selfdrive/car/carcontroller/struct.ActuationController.html):
//!   Turns a desired actuation command into a bounded, framed output list
//!   with rolling counters and button pulse pacing.
//!
//! Raw CAN frame decoding, wire-level byte layout of outgoing frames, and the
//! decision of *whether* the system should be enabled all live in adjacent
//! collaborators; this crate only turns a desired command into bounded output
//! and a canonical state snapshot.
//!
//! ## Example
//!
//! ```rust
//! use carpilot::selfdrive::car::carcontroller::{
//!     ActuationCommand, ActuationController, HudAlert,
//! };
//! use carpilot::selfdrive::car::carstate::StateEstimator;
//! use carpilot::selfdrive::car::signals::SignalTable;
//! use carpilot::selfdrive::car::values::VehicleProfile;
//!
//! // Resolve the vehicle profile once at session start.
//! let profile = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap();
//! let mut estimator = StateEstimator::new(profile.clone());
//! let mut controller = ActuationController::new(profile);
//!
//! // Each control cycle: decoded signals in, state snapshot and frames out.
//! let mut signals = SignalTable::new();
//! signals.set("WHEEL_SPEEDS", "WHEEL_SPEED_FL", 36.0);
//! signals.set("WHEEL_SPEEDS", "WHEEL_SPEED_FR", 36.0);
//! signals.set("WHEEL_SPEEDS", "WHEEL_SPEED_RL", 36.0);
//! signals.set("WHEEL_SPEEDS", "WHEEL_SPEED_RR", 36.0);
//!
//! let state = estimator.update(&signals);
//! let command = ActuationCommand {
//!     steer: 0.1,
//!     enabled: true,
//!     cancel: false,
//!     hud_alert: HudAlert::None,
//! };
//! let frames = controller.update(&state, 0, &command);
//! assert!(!frames.is_empty());
//! ```
//!
//! ## License
//!
//! This project is licensed under the MIT License.

pub mod common;
pub mod selfdrive;
