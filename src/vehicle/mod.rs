//! Vehicle Module
//!
//! Owns the shared device state and the periodic control loop that samples
//! sensors and emits telemetry.

mod actuator;
mod control_loop;
mod state;

pub use actuator::{Actuator, LoggingActuator};
pub use control_loop::ControlLoop;
pub use state::{SharedVehicle, VehicleState};
