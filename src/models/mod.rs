//! All the database models live here.

pub use account::*;
pub use chat::*;
pub use plan::*;
pub use relationship::*;

mod account;
mod chat;
mod plan;
mod relationship;
