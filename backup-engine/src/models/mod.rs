pub mod archive;
pub mod dump;
