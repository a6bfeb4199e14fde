//! Domain models for the AgroX farm advisory service

mod analysis;
mod chat;
mod market;
mod soil;
mod user;
mod weather;

pub use analysis::*;
pub use chat::*;
pub use market::*;
pub use soil::*;
pub use user::*;
pub use weather::*;
