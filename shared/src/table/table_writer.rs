use log::warn;

use netstrings_serde::{BitWrite, DynUnsignedInteger, Serde};

use crate::{
    constants::{DICTIONARY_COVERAGE_MIN_ENTRIES, MAX_PAYLOAD_BITS, SUBSTRING_BITS},
    types::{Tick, BASELINE_TICK},
};

use super::{
    history::StringHistory,
    item::StringTableItem,
    string_table::{PayloadLayout, StringTable},
};

/// Writes the implicit-increment flag, and the full index when it's not the
/// successor of `last`.
pub(crate) fn write_index(writer: &mut dyn BitWrite, last: Option<u32>, index: u32, bits: u8) {
    let sequential = match last {
        Some(last) => last.checked_add(1) == Some(index),
        None => index == 0,
    };
    writer.write_bit(sequential);
    if !sequential {
        DynUnsignedInteger::new(u64::from(index), bits).ser(writer);
    }
}

fn write_payload(writer: &mut dyn BitWrite, layout: PayloadLayout, item: &StringTableItem) {
    let Some(payload) = item.payload().filter(|payload| !payload.is_empty()) else {
        writer.write_bit(false);
        return;
    };

    writer.write_bit(true);
    match layout {
        PayloadLayout::Fixed { bits, .. } => {
            writer.write_bits(payload, u32::from(bits));
        }
        PayloadLayout::Variable => {
            DynUnsignedInteger::new(payload.len() as u64, MAX_PAYLOAD_BITS).ser(writer);
            writer.write_bits(payload, payload.len() as u32 * 8);
        }
    }
}

/// Encodes the changed entries of one table for one consumer.
pub struct StringTableWriter<'t> {
    table: &'t StringTable,
}

impl<'t> StringTableWriter<'t> {
    pub fn new(table: &'t StringTable) -> Self {
        Self { table }
    }

    /// Whether entries can be sent as dictionary indices.
    pub fn encodes_with_dictionary(&self, allow_dictionary: bool) -> bool {
        allow_dictionary
            && self.table.uses_dictionary()
            && self.table.config().use_dictionaries
            && self.table.dictionary().is_valid()
    }

    /// Writes every producer entry changed after `last_ack_tick` and returns
    /// how many were written.
    pub fn write(
        &self,
        writer: &mut dyn BitWrite,
        last_ack_tick: Tick,
        allow_dictionary: bool,
    ) -> usize {
        let table = self.table;
        let config = table.config();
        let dictionary = table.dictionary();
        let use_dictionary = self.encodes_with_dictionary(allow_dictionary);

        writer.write_bit(use_dictionary);

        let mut history = StringHistory::new(config.history_capacity(), config.min_substring_match);
        let mut last_entry: Option<u32> = None;
        let mut last_dictionary_index: Option<u32> = None;
        let mut entries_written = 0;
        let mut dictionary_hits = 0;

        for (index, item) in table.items().iter() {
            if item.tick_changed() <= last_ack_tick {
                continue;
            }

            write_index(writer, last_entry, index, table.entry_bits());

            if item.tick_created() >= last_ack_tick {
                // new to this consumer, send the string itself
                writer.write_bit(true);

                let dictionary_index = item
                    .dictionary_index()
                    .filter(|dictionary_index| use_dictionary && (*dictionary_index as usize) < dictionary.len());

                if let Some(dictionary_index) = dictionary_index {
                    dictionary_hits += 1;
                    writer.write_bit(true);
                    write_index(
                        writer,
                        last_dictionary_index,
                        dictionary_index,
                        dictionary.encode_bits(),
                    );
                    last_dictionary_index = Some(dictionary_index);
                } else {
                    if use_dictionary {
                        writer.write_bit(false);
                    }

                    let name = item.name();
                    match history.best_match(name) {
                        Some((slot, shared)) => {
                            writer.write_bit(true);
                            DynUnsignedInteger::new(u64::from(slot), SUBSTRING_BITS).ser(writer);
                            DynUnsignedInteger::new(shared as u64, SUBSTRING_BITS).ser(writer);
                            name[shared..].to_string().ser(writer);
                        }
                        None => {
                            writer.write_bit(false);
                            name.to_string().ser(writer);
                        }
                    }
                }
            } else {
                writer.write_bit(false);
            }

            write_payload(writer, table.payload_layout(), item);

            history.push(item.name());
            entries_written += 1;
            last_entry = Some(index);
        }

        let count = table.num_strings();
        if last_ack_tick == BASELINE_TICK
            && use_dictionary
            && count > DICTIONARY_COVERAGE_MIN_ENTRIES
            && (dictionary_hits as f32) < config.dictionary_hit_warning_ratio * count as f32
        {
            warn!(
                "String table dictionary for {} should be rebuilt, only found {} of {} strings in dictionary",
                table.name(),
                dictionary_hits,
                count
            );
        }

        entries_written
    }
}
