pub mod config;
pub mod database;
pub mod logging;
pub mod models;
pub mod workspace;

pub use database::init_database;
