//! Client for the Monnit iMonnit sensor API: network and sensor listing, and
//! retrieval of sensor readings over windows of any length.

pub mod config;
pub mod models;
pub mod services;
pub mod settings;
