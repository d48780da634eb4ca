//! Minimal-subset samplers for the consensus loop.
//!
//! - [`UniformRandomSampler`] draws every subset uniformly (RANSAC, MSAC,
//!   LMedS).
//! - [`ProsacSampler`] draws from a progressively growing prefix of the
//!   evaluations ranked by quality (PROSAC, PROMedS).

pub mod prosac;
pub mod uniform;

pub use prosac::{quality_order, ProsacSampler};
pub use uniform::UniformRandomSampler;
