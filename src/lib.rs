pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod security;
pub mod validation;

pub use error::Error;
