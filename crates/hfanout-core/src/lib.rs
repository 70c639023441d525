//! # hfanout-core — Trait definitions for hfanout
//!
//! This crate defines the boundary types of the hfanout HTTP client engine:
//! the request model, the callback consumer interface, the error taxonomy,
//! and the transfer-engine collaborator traits.
//!
//! ## Design principle
//!
//! The engine crate depends on the traits defined here, never on a concrete
//! transfer engine. The real wire engine (libcurl-style multi handle) and the
//! deterministic lab engine used in tests are interchangeable behind
//! [`transfer::TransferEngine`].

pub mod callbacks;
pub mod error;
pub mod method;
pub mod request;
pub mod transfer;
