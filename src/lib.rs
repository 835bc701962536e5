pub mod config;
pub mod reference;
pub mod pipeline;
pub mod server;
