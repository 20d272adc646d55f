use thiserror::Error;

/// Conversion factor from km/h to m/s, the unit of all speeds in this crate.
pub const KPH_TO_MS: f64 = 1.0 / 3.6;

/// Driver torque above which the driver is considered to be overriding.
///
/// The torque sensor's own override bit triggers at too high torque values,
/// so the threshold is applied to the raw driver torque instead.
pub const STEER_THRESHOLD: f64 = 100.0;

/// Steady-state Kalman gain for the wheel-speed velocity filter.
pub const V_EGO_KF_GAIN: [f64; 2] = [0.12287673, 0.29666309];

/// Control loop period in seconds (100 Hz cadence).
pub const LOOP_DT: f64 = 0.01;

/// Configuration failure raised while resolving a vehicle profile.
///
/// Profile resolution happens once at session start; nothing in the per-cycle
/// path can produce this error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The fingerprint string does not name a supported vehicle.
    #[error("unknown vehicle model: {0}")]
    UnknownModel(String),
}

/// Supported vehicle models, one per fingerprint string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarModel {
    Corolla,
    CorollaTss2,
    Rav4,
    Prius,
    LexusIs,
    LexusIsh,
    LexusGsh,
}

/// Gear selector position decoded from the gear packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gear {
    Park,
    Reverse,
    Neutral,
    Drive,
    Brake,
    /// Raw code not present in the profile's gear table.
    Unknown,
}

/// Which message carries the steering angle, resolved once per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleSource {
    /// Dedicated angle sensor: coarse angle plus fraction.
    DedicatedSensor,
    /// Torque-sensor angle, factory calibrated (TSS2-class EPS).
    TorqueSensor,
    /// Torque-sensor angle that zeroes at power-up; a one-shot offset
    /// against the dedicated sensor is learned, then frozen.
    TorqueSensorCalibrated,
}

/// Which message carries cruise main-on and set-speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CruiseSource {
    /// Dedicated DSU cruise message.
    Dsu,
    /// Alternate PCM cruise message (hybrid platforms).
    PcmAlt,
    /// Secondary PCM cruise message; the only source that also carries the
    /// low-speed lockout state.
    Pcm2,
}

/// Which message carries the gas pedal position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSource {
    Pedal,
    /// Alternate pedal message (hybrid platforms).
    PedalAlt,
    /// Aftermarket interceptor with two redundant channels, averaged.
    Interceptor,
}

/// Which message drives the generic toggle flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleSource {
    /// Autopark status message: toggled while the state is nonzero.
    AutoparkState,
    /// Auto-high-beam bit on the light stalk message.
    LightStalk,
    /// Auto-high-beam bit on the alternate light stalk message.
    LightStalkAlt,
}

/// Torque-rate limiter parameters.
///
/// These bound how fast the commanded steering torque may move and how much
/// of the torque budget survives a driver pushing against the command.
#[derive(Debug, Clone, Copy)]
pub struct SteerLimits {
    /// Maximum commanded torque magnitude.
    pub steer_max: f64,
    /// Per-cycle step limit when the torque magnitude increases.
    pub steer_delta_up: f64,
    /// Per-cycle step limit when the torque magnitude decreases.
    pub steer_delta_down: f64,
    /// Driver torque tolerated before the allowed band starts shrinking.
    pub steer_driver_allowance: f64,
    /// Multiplier on the driver-torque term of the band.
    pub steer_driver_multiplier: f64,
    /// Scale applied to the raw driver torque before banding.
    pub steer_driver_factor: f64,
}

const STEER_LIMITS: SteerLimits = SteerLimits {
    steer_max: 1500.0,
    steer_delta_up: 10.0,
    steer_delta_down: 25.0,
    steer_driver_allowance: 350.0,
    steer_driver_multiplier: 1.0,
    steer_driver_factor: 1.0,
};

/// Gear packet raw code to selector position.
const GEAR_TABLE: &[(u8, Gear)] = &[
    (32, Gear::Park),
    (16, Gear::Reverse),
    (8, Gear::Neutral),
    (0, Gear::Drive),
    (1, Gear::Brake),
];

/// EPS state codes that do not indicate a steering fault.
const OK_STEER_STATES: &[u8] = &[1, 5];

/// Static per-model configuration: signal sources, thresholds, limits and
/// lookup tables. Resolved once at session start and immutable afterwards.
///
/// # Examples
///
/// ```rust
/// use carpilot::selfdrive::car::values::{AngleSource, VehicleProfile};
///
/// let profile = VehicleProfile::for_model("TOYOTA COROLLA TSS2 2019").unwrap();
/// assert_eq!(profile.angle_source, AngleSource::TorqueSensor);
///
/// assert!(VehicleProfile::for_model("YUGO 45 1985").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct VehicleProfile {
    pub model: CarModel,
    pub angle_source: AngleSource,
    pub cruise_source: CruiseSource,
    pub gas_source: GasSource,
    pub toggle_source: ToggleSource,
    /// Driver torque beyond which `steer_override` holds.
    pub override_threshold: f64,
    pub steer_limits: SteerLimits,
    /// Wheel speed signal unit to m/s.
    pub wheel_speed_factor: f64,
    /// Velocity filter time step.
    pub kf_dt: f64,
    /// Velocity filter steady-state gain.
    pub kf_gain: [f64; 2],
    /// Raw gear code to selector position; unmapped codes decode as
    /// [`Gear::Unknown`].
    pub gear_table: &'static [(u8, Gear)],
    /// EPS state codes accepted as fault-free.
    pub ok_steer_states: &'static [u8],
    /// The stock cruise status signal is unreliable on this platform and the
    /// active flag must be re-derived from gear/seatbelt/door gating when the
    /// driver has armed the system.
    pub stock_cruise_unreliable: bool,
}

impl VehicleProfile {
    /// Resolves a fingerprint string to a vehicle profile.
    ///
    /// # Arguments
    ///
    /// * `fingerprint` - Vehicle model name as reported by fingerprinting.
    ///
    /// # Returns
    ///
    /// The model's profile, or [`ConfigError::UnknownModel`] for a
    /// fingerprint outside the supported set. This is the only fallible
    /// entry point; every per-cycle dispatch is total once construction
    /// succeeds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use carpilot::selfdrive::car::values::{CarModel, VehicleProfile};
    ///
    /// let profile = VehicleProfile::for_model("LEXUS ISH 2017").unwrap();
    /// assert_eq!(profile.model, CarModel::LexusIsh);
    /// assert!(profile.stock_cruise_unreliable);
    /// ```
    pub fn for_model(fingerprint: &str) -> Result<Self, ConfigError> {
        let model = match fingerprint {
            "TOYOTA COROLLA 2017" => CarModel::Corolla,
            "TOYOTA COROLLA TSS2 2019" => CarModel::CorollaTss2,
            "TOYOTA RAV4 2017" => CarModel::Rav4,
            "TOYOTA PRIUS 2017" => CarModel::Prius,
            "LEXUS IS 2018" => CarModel::LexusIs,
            "LEXUS ISH 2017" => CarModel::LexusIsh,
            "LEXUS GSH 2018" => CarModel::LexusGsh,
            _ => return Err(ConfigError::UnknownModel(fingerprint.to_string())),
        };

        let profile = Self::from_car_model(model);
        log::info!("resolved vehicle profile {:?} for {:?}", profile.model, fingerprint);
        Ok(profile)
    }

    /// Builds the profile for a known model. Total over [`CarModel`].
    pub fn from_car_model(model: CarModel) -> Self {
        let base = VehicleProfile {
            model,
            angle_source: AngleSource::DedicatedSensor,
            cruise_source: CruiseSource::Pcm2,
            gas_source: GasSource::Pedal,
            toggle_source: ToggleSource::LightStalk,
            override_threshold: STEER_THRESHOLD,
            steer_limits: STEER_LIMITS,
            wheel_speed_factor: KPH_TO_MS,
            kf_dt: LOOP_DT,
            kf_gain: V_EGO_KF_GAIN,
            gear_table: GEAR_TABLE,
            ok_steer_states: OK_STEER_STATES,
            stock_cruise_unreliable: false,
        };

        match model {
            CarModel::Corolla => base,
            CarModel::CorollaTss2 => VehicleProfile {
                angle_source: AngleSource::TorqueSensor,
                ..base
            },
            CarModel::Rav4 => VehicleProfile {
                angle_source: AngleSource::TorqueSensorCalibrated,
                ..base
            },
            CarModel::Prius => VehicleProfile {
                angle_source: AngleSource::TorqueSensorCalibrated,
                toggle_source: ToggleSource::AutoparkState,
                ..base
            },
            CarModel::LexusIs => VehicleProfile {
                cruise_source: CruiseSource::Dsu,
                ..base
            },
            CarModel::LexusIsh => VehicleProfile {
                angle_source: AngleSource::TorqueSensorCalibrated,
                cruise_source: CruiseSource::PcmAlt,
                gas_source: GasSource::PedalAlt,
                toggle_source: ToggleSource::LightStalkAlt,
                stock_cruise_unreliable: true,
                ..base
            },
            CarModel::LexusGsh => VehicleProfile {
                cruise_source: CruiseSource::PcmAlt,
                gas_source: GasSource::PedalAlt,
                toggle_source: ToggleSource::LightStalkAlt,
                stock_cruise_unreliable: true,
                ..base
            },
        }
    }

    /// Decodes a raw gear packet code through the profile's gear table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use carpilot::selfdrive::car::values::{Gear, VehicleProfile};
    ///
    /// let profile = VehicleProfile::for_model("TOYOTA COROLLA 2017").unwrap();
    /// assert_eq!(profile.parse_gear(0), Gear::Drive);
    /// assert_eq!(profile.parse_gear(77), Gear::Unknown);
    /// ```
    pub fn parse_gear(&self, code: u8) -> Gear {
        self.gear_table
            .iter()
            .find(|(raw, _)| *raw == code)
            .map(|(_, gear)| *gear)
            .unwrap_or(Gear::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODELS: [CarModel; 7] = [
        CarModel::Corolla,
        CarModel::CorollaTss2,
        CarModel::Rav4,
        CarModel::Prius,
        CarModel::LexusIs,
        CarModel::LexusIsh,
        CarModel::LexusGsh,
    ];

    #[test]
    fn test_unknown_model_is_config_error() {
        let err = VehicleProfile::for_model("HONDA CIVIC 2016").unwrap_err();
        assert_eq!(err, ConfigError::UnknownModel("HONDA CIVIC 2016".to_string()));
    }

    #[test]
    fn test_every_model_resolves() {
        for model in ALL_MODELS {
            let profile = VehicleProfile::from_car_model(model);
            assert_eq!(profile.model, model);
            assert!(profile.steer_limits.steer_max > 0.0);
            assert!(profile.override_threshold > 0.0);
        }
    }

    #[test]
    fn test_hybrid_lexus_marks_cruise_unreliable() {
        for model in [CarModel::LexusIsh, CarModel::LexusGsh] {
            assert!(VehicleProfile::from_car_model(model).stock_cruise_unreliable);
        }
        assert!(!VehicleProfile::from_car_model(CarModel::Corolla).stock_cruise_unreliable);
    }

    #[test]
    fn test_gear_table_decode() {
        let profile = VehicleProfile::from_car_model(CarModel::Corolla);
        assert_eq!(profile.parse_gear(32), Gear::Park);
        assert_eq!(profile.parse_gear(16), Gear::Reverse);
        assert_eq!(profile.parse_gear(8), Gear::Neutral);
        assert_eq!(profile.parse_gear(0), Gear::Drive);
        assert_eq!(profile.parse_gear(1), Gear::Brake);
        assert_eq!(profile.parse_gear(255), Gear::Unknown);
    }

    #[test]
    fn test_angle_source_dispatch() {
        assert_eq!(
            VehicleProfile::from_car_model(CarModel::CorollaTss2).angle_source,
            AngleSource::TorqueSensor
        );
        assert_eq!(
            VehicleProfile::from_car_model(CarModel::Rav4).angle_source,
            AngleSource::TorqueSensorCalibrated
        );
        assert_eq!(
            VehicleProfile::from_car_model(CarModel::Corolla).angle_source,
            AngleSource::DedicatedSensor
        );
    }
}
