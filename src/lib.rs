//! licensegate - license activation and single-use redirect gateway
//!
//! Principals from an external identity provider activate time-limited
//! license keys, then exchange them for short-lived redirect tokens that the
//! public gateway redeems exactly once.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod licensing;
pub mod middleware;
pub mod models;
pub mod redirect;
pub mod util;
