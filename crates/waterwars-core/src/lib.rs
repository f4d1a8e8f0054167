//! Configuration, round clock, and orchestration for the WaterWars engine.
//!
//! This crate ties the strategy crates together into a playable game:
//! it loads the YAML configuration, builds the chosen strategies and the
//! starting board, and drives rounds through their build, allocation, and
//! revenue phases.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `waterwars-config.yaml` into
//!   strongly-typed structs.
//! - [`strategies`] -- Strategy kinds and their construction.
//! - [`scenario`] -- Building the starting game from the configured board.
//! - [`clock`] -- Round and phase tracking.
//! - [`round`] -- [`RoundManager`], [`AllocationDesk`], and the round
//!   callback.
//!
//! [`RoundManager`]: round::RoundManager
//! [`AllocationDesk`]: round::AllocationDesk

pub mod clock;
pub mod config;
pub mod round;
pub mod scenario;
pub mod strategies;
