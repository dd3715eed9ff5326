//! Personalized content recommendation service.
//!
//! Scores catalog content against each user's preferences and interaction
//! history, serves the results through a cache-aside layer, and keeps that
//! layer honest by invalidating it on the write path.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
