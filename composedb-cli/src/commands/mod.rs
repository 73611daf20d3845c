pub mod backup;
pub mod connection;
pub mod project;
pub mod query;
pub mod restore;
pub mod status;
