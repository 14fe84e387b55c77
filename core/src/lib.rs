//! icf-core: interchange fee-cap impact estimation.
//!
//! Module map:
//!   types / rate        row types, category enum, unit conversion
//!   schedule            cap schedule, user edits, base-schedule builder
//!   calculator / impact the pure estimate pipeline and its result tables
//!   session             per-user edit state and command dispatch
//!   store / warehouse   SQLite extract and the TTL query cache
//!   config / auth       data-dir config, env config, credential gate
//!   rng / synthetic     seeded synthetic markets

pub mod auth;
pub mod calculator;
pub mod config;
pub mod error;
pub mod impact;
pub mod rate;
pub mod rng;
pub mod schedule;
pub mod session;
pub mod store;
pub mod synthetic;
pub mod types;
pub mod warehouse;
