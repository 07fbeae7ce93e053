pub mod cache;
pub mod config;
pub mod play;
pub mod table;
pub mod tenants;
