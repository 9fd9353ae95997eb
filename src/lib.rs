pub mod config;
pub mod feedback;
pub mod provider;
pub mod resolution;
pub mod shared;
pub mod store;
