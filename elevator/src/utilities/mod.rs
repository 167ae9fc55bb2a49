pub mod request_queue;
pub mod travel_clock;
