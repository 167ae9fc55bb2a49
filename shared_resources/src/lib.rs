pub mod config;
pub mod direction;
pub mod elevator_status;
pub mod link;
pub mod logger;
pub mod request;
pub mod system_message;
