pub mod packet_exchange;
pub mod tables;
pub mod test_consumer;
pub mod test_producer;

pub use assertions::table_contents;
pub use packet_exchange::{connect, exchange_updates, tick_and_exchange};
pub use tables::{empty_copy_of, new_table, transfer, transfer_without_dictionary};
pub use test_consumer::TestConsumer;
pub use test_producer::TestProducer;
