pub mod elevator_assigner;
pub mod registry;
