pub mod attributes;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod legend;
pub mod radius;
pub mod render;
pub mod server;
pub mod session;
pub mod stats;
pub mod surface;
pub mod symbols;
pub mod types;
