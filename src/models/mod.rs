pub mod error;
pub mod network;
pub mod reading;
pub mod window;
