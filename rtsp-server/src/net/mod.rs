pub mod connection;
pub mod connection_manager;
pub mod server;
