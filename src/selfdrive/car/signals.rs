use std::collections::HashMap;

/// Decoded CAN signal values for one control cycle.
///
/// The external CAN decoder refreshes this table every cycle; message
/// freshness and staleness are its responsibility. Readers supply a
/// documented per-signal default, so a missing or expired signal degrades
/// that one derivation instead of failing the cycle.
///
/// # Examples
///
/// ```rust
/// use carpilot::selfdrive::car::signals::SignalTable;
///
/// let mut signals = SignalTable::new();
/// signals.set("WHEEL_SPEEDS", "WHEEL_SPEED_FL", 43.2);
///
/// assert_eq!(signals.get("WHEEL_SPEEDS", "WHEEL_SPEED_FL", 0.0), 43.2);
/// // Absent signal falls back to its caller-documented default.
/// assert_eq!(signals.get("SEATS_DOORS", "DOOR_OPEN_FL", 1.0), 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    values: HashMap<(String, String), f64>,
}

impl SignalTable {
    /// Creates an empty signal table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the decoded value of `(message, field)`.
    pub fn set(&mut self, message: &str, field: &str, value: f64) {
        self.values
            .insert((message.to_string(), field.to_string()), value);
    }

    /// Reads `(message, field)`, falling back to `default` when absent.
    pub fn get(&self, message: &str, field: &str, default: f64) -> f64 {
        self.values
            .get(&(message.to_string(), field.to_string()))
            .copied()
            .unwrap_or(default)
    }

    /// Reads `(message, field)` as a flag; nonzero is true.
    pub fn get_bool(&self, message: &str, field: &str, default: bool) -> bool {
        self.get(message, field, if default { 1.0 } else { 0.0 }) != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut signals = SignalTable::new();
        signals.set("BRAKE_MODULE", "BRAKE_PRESSED", 1.0);
        assert_eq!(signals.get("BRAKE_MODULE", "BRAKE_PRESSED", 0.0), 1.0);
        assert!(signals.get_bool("BRAKE_MODULE", "BRAKE_PRESSED", false));
    }

    #[test]
    fn test_absent_signal_uses_default() {
        let signals = SignalTable::new();
        assert_eq!(signals.get("STEERING_LEVERS", "TURN_SIGNALS", 3.0), 3.0);
        assert!(signals.get_bool("SEATS_DOORS", "SEATBELT_DRIVER_UNLATCHED", true));
        assert!(!signals.get_bool("PCM_CRUISE", "CRUISE_ACTIVE", false));
    }

    #[test]
    fn test_overwrite_keeps_latest_value() {
        let mut signals = SignalTable::new();
        signals.set("GAS_PEDAL", "GAS_PEDAL", 0.2);
        signals.set("GAS_PEDAL", "GAS_PEDAL", 0.7);
        assert_eq!(signals.get("GAS_PEDAL", "GAS_PEDAL", 0.0), 0.7);
    }
}
