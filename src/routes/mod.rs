pub use booking::error_chain_fmt;

pub mod booking;
pub mod health_check;
