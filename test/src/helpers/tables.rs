use std::sync::Arc;

use netstrings_serde::{BitReader, BitWriter};
use netstrings_shared::{
    Dictionary, PayloadLayout, ProtocolError, StringTable, StringTableConfig, TableFlags, Tick,
};

pub fn new_table(
    name: &str,
    max_entries: u32,
    payload_layout: PayloadLayout,
    flags: TableFlags,
    dictionary: Arc<Dictionary>,
) -> StringTable {
    StringTable::new(
        0,
        name,
        max_entries,
        payload_layout,
        flags,
        dictionary,
        StringTableConfig::default(),
    )
    .expect("valid table shape")
}

/// Empty table with the same shape, dictionary and config as `table`.
pub fn empty_copy_of(table: &StringTable) -> StringTable {
    StringTable::new(
        table.id(),
        table.name(),
        table.max_strings(),
        table.payload_layout(),
        table.flags(),
        table.dictionary().clone(),
        table.config().clone(),
    )
    .expect("valid table shape")
}

/// Writes the update of `producer` since `last_ack_tick` and parses it into
/// `consumer`. Returns the number of entries sent.
pub fn transfer(
    producer: &StringTable,
    consumer: &mut StringTable,
    last_ack_tick: Tick,
) -> Result<usize, ProtocolError> {
    let mut writer = BitWriter::new();
    let count = producer.write_update(&mut writer, last_ack_tick);
    parse(writer, consumer, count)?;
    Ok(count)
}

pub fn transfer_without_dictionary(
    producer: &StringTable,
    consumer: &mut StringTable,
    last_ack_tick: Tick,
) -> Result<usize, ProtocolError> {
    let mut writer = BitWriter::new();
    let count = producer.write_update_without_dictionary(&mut writer, last_ack_tick);
    parse(writer, consumer, count)?;
    Ok(count)
}

fn parse(writer: BitWriter, consumer: &mut StringTable, count: usize) -> Result<(), ProtocolError> {
    let bits = writer.bits_written() as usize;
    let bytes = writer.to_bytes();
    consumer.parse_update(&mut BitReader::with_bit_length(&bytes, bits), count)
}
