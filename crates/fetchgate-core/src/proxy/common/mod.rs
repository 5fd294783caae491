// Shared helpers for the proxy engine

pub mod client_builder;
pub mod header_constants;
pub mod random_id;
