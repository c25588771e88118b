//! ark-video library crate.
//!
//! This module exposes the internal components for the binary and for
//! integration testing.

pub mod ark;
pub mod cli;
pub mod config;
pub mod context;
pub mod media;
pub mod prompts;
pub mod seed_image;
pub mod settings;
pub mod shutdown;
pub mod subtitle;
pub mod webhook;
pub mod workflow;
