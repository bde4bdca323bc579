//! HTTP surface for dbkup

pub mod rest;
pub mod types;

pub use rest::{AppState, create_router, serve};
pub use types::*;
