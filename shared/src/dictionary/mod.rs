pub mod dictionary;
pub mod error;
pub mod manager;
pub mod store;
