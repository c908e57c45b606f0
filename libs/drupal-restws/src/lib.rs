#![forbid(unsafe_code)]

//! Client for Drupal's RESTful Web Services module (`restws`).
//!
//! A [`RestWsClient`] logs in with a form post, fetches a CSRF token, and
//! keeps that session alive lazily: every call checks the token expiry and
//! re-authenticates at most once per client when it has gone stale.
//! Collections are read page by page through [`EntityListing`].

pub mod api;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod pagination;
pub mod session;

pub use api::{Filters, PagePayload, RestWsApi};
pub use client::RestWsClient;
pub use config::RestWsConfig;
pub use error::RestWsError;
pub use pagination::{EntityListing, EntityPage};
pub use session::Session;
