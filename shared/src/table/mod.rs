pub mod error;
pub mod history;
pub mod index;
pub mod item;
pub mod item_list;
pub mod mirror;
pub mod snapshot;
pub mod string_table;
pub mod table_reader;
pub mod table_writer;
