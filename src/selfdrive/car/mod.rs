pub mod carcontroller;
pub mod carstate;
pub mod signals;
pub mod values;
pub mod velocity;

pub use carcontroller::{ActuationCommand, ActuationController, OutgoingFrame};
pub use carstate::{StateEstimator, VehicleState};
pub use signals::SignalTable;
pub use values::{ConfigError, VehicleProfile};
