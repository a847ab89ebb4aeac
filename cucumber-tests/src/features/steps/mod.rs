pub mod common_steps;
pub mod error_steps;
pub mod form_steps;
pub mod keep_alive_steps;
pub mod routing_steps;
pub mod session_steps;
