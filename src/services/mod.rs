pub mod clearance;
pub mod directory;
pub mod lifecycle;
pub mod settlement;
pub mod state_machine;
