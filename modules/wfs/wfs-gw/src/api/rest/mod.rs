//! HTTP surface of the WFS endpoint.

pub mod error;
pub mod handlers;
pub mod routes;
