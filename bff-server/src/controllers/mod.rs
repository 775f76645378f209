pub mod api2;
pub mod workflow;
