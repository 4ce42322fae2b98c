//! # coachhub
//!
//! coachhub is the server of a fitness coaching platform: client and trainer
//! accounts, training plan authoring, workout logging, messaging and
//! notifications.
//!
//! The heart of the crate is the [engine] module, which owns the rules of the
//! trainer - client relationship lifecycle.
#![warn(missing_docs)]
#![cfg_attr(
    feature = "rorm-main",
    allow(dead_code, unused_variables, unused_imports)
)]

pub mod chan;
pub mod config;
pub mod engine;
pub mod models;
pub mod server;
