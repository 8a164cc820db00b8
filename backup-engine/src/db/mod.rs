pub mod connection;
pub mod dump;
pub mod restore;
