//! Network access for the kanthu offline worker.
//!
//! This crate provides the `Network` seam the worker fetches through and the
//! reqwest-backed implementation used in production.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, is_same_origin, resolve};
