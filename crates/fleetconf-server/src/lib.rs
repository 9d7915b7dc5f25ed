//! Fleetconf Server - command line front end of the configuration engine
//!
//! - `settings`: configuration file, environment and overrides
//! - `startup`: logging initialization
//! - `bootstrap`: engine context wiring
//! - `cli`: subcommands mapped onto engine operations

pub mod bootstrap;
pub mod cli;
pub mod settings;
pub mod startup;
