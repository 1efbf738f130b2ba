// src/lib.rs

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

pub use routes::create_router;
