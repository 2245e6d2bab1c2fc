pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingredients;
pub mod recipes;
pub mod state;
pub mod store;
pub mod tags;
pub mod validate;
