//! Everything that talks to the Slack Web API: the HTTP client, OAuth, token
//! rotation, channel listing and message posting, plus the subrouters that
//! expose these to the dashboard.
//!
//! The client takes its base URL as a parameter so that tests can point it at
//! a local mock server.

pub mod api;
pub mod auth;
pub mod channel;
pub mod error;
pub mod message;
pub mod oauth;
pub mod router;
pub mod team;
