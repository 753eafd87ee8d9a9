pub mod auth;
pub mod config;
pub mod db;
pub mod fx;
pub mod gateway;
pub mod logging;
pub mod transaction;
pub mod wallet;
