pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod ics;
pub mod integration;
pub mod model;
pub mod routes;
pub mod service;
pub mod settings;
pub mod store;
pub mod test_utils;
pub mod utils;
