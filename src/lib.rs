//! Turnstile - In-Process Request Admission Control
//!
//! This crate gates inbound requests to a served API by client identity and
//! endpoint class using fixed-window counters. The serving layer asks a
//! [`Limiter`](admission::Limiter) for a decision before each handler runs;
//! a background [`Sweeper`](admission::Sweeper) evicts expired counting
//! windows to bound memory. State lives in a single process's memory; there
//! is no cross-instance coordination.

pub mod admission;
pub mod boundary;
pub mod config;
pub mod error;
pub mod request;
