pub mod client;
pub mod error;
pub mod layers;
pub mod service;
