#![forbid(unsafe_code)]

//! Small building blocks shared by the gateway crates.

pub mod humantime_serde;
pub mod lazy_cell;
pub mod secret_string;

pub use lazy_cell::LazyCell;
pub use secret_string::SecretString;
