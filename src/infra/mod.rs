pub mod cache;
pub mod db;
pub mod error;
pub mod http;
pub mod images;
pub mod telemetry;
