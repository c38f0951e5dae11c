pub mod connection;
pub mod ids;
pub mod indexes;
pub mod models;

pub use connection::connect;
