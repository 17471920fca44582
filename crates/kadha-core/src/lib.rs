//! # Kadha Core
//!
//! The domain layer of the Kadha blogging backend.
//! This crate contains the catalog query model, tag reconciliation, the
//! publication lifecycle and the application services. It has zero
//! infrastructure dependencies; storage and crypto are reached through
//! the traits in [`ports`].

pub mod catalog;
pub mod domain;
pub mod error;
pub mod ports;
pub mod reconcile;
pub mod services;

pub use error::{DomainError, RepoError};
