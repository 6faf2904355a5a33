pub mod auth;
pub mod categories;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod storage;
