pub mod clearance;
pub mod exit_case;
pub mod general;
pub mod settlement;
