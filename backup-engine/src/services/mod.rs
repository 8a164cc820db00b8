pub mod archive;
pub mod backup;
pub mod catalog;
pub mod restore;
pub mod retention;
