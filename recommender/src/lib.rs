//! Client for the product recommendation API.

pub mod client;
pub mod config;
pub mod metrics_defs;
pub mod types;

#[cfg(test)]
mod testutils;

pub use client::{RecommendationClient, RecommendationFetchError, RecommendationRequest};
pub use types::{Price, Product, RecommendationResult};
