//! adhan library
//!
//! This module exposes the prayer time pipeline for the binary and for
//! integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod present;
pub mod resolver;
pub mod schedule;
