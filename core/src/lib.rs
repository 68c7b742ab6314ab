pub mod checked;
pub mod db;
pub mod grocery;
pub mod models;
pub mod service;
pub mod state;
pub mod store;
pub mod week;
