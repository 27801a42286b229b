pub mod container;
pub mod error;
pub mod messages;
