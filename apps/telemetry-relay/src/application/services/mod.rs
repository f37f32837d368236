//! Application Services
//!
//! - `RelayService`: handles broker messages and evaluates alerts
//! - `ControlIntake`: republishes client control commands to the broker

mod control;
mod relay;

pub use control::{ControlIntake, ControlReport};
pub use relay::{MessageOutcome, RelayService};
