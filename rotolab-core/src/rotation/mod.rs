//! Capital rotation — the venue seam, the rotation controller, and a
//! simulated venue for tests and offline runs.

pub mod controller;
pub mod sim;
pub mod venue;

pub use controller::{HoldState, RotationController, RotationError};
pub use sim::{FillMode, SimVenue};
pub use venue::{ExecutionVenue, VenueError};
