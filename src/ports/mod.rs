//! Port traits separating the domain from the outside world.

pub mod config_port;
pub mod quote_port;
pub mod report_port;
