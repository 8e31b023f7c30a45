pub mod config;
pub mod manager;
pub mod models;
pub mod storage;
pub mod ui;
