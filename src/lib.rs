pub mod config;
pub mod game;
pub mod ui;

pub use game::altitude::{AggregationError, AltitudeAxis, AxisBounds};
pub use game::indicator::AgentId;
pub use game::meter::{HeightMeter, RosterEntry};
