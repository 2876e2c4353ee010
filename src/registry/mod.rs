// src/registry/mod.rs
//
// Deputy package server access: packages, versions, categories and API tokens

pub mod client;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod versions;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use client::{RegistryClient, RegistryError};
pub use routes::registry_routes;
