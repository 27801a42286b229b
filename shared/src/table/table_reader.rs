use netstrings_serde::{BitReader, DynUnsignedInteger, Serde};

use crate::{
    constants::{MAX_PAYLOAD_BITS, SUBSTRING_BITS},
    types::TableRole,
};

use super::{
    error::{ProtocolError, StringTableError},
    history::StringHistory,
    index::StringIndex,
    string_table::{PayloadLayout, StringTable},
};

/// Applies updates produced by `StringTableWriter` to a consumer's table.
pub struct StringTableReader<'t> {
    table: &'t mut StringTable,
}

impl<'t> StringTableReader<'t> {
    pub fn new(table: &'t mut StringTable) -> Self {
        Self { table }
    }

    /// Reads `entry_count` entries and applies them in order.
    pub fn read(self, reader: &mut BitReader, entry_count: usize) -> Result<(), ProtocolError> {
        let table = self.table;
        let name = table.name().to_string();

        let dictionary = table.dictionary().clone();
        let max_entries = table.max_strings();
        let entry_bits = table.entry_bits();
        let layout = table.payload_layout();

        let use_dictionary = reader.read_bit().map_err(ProtocolError::truncated(&name))?;

        let mut history = StringHistory::new(
            table.config().history_capacity(),
            table.config().min_substring_match,
        );
        let mut last_entry: Option<u64> = None;
        let mut last_dictionary_index: Option<u64> = None;

        for _ in 0..entry_count {
            let sequential = reader.read_bit().map_err(ProtocolError::truncated(&name))?;
            let index = if sequential {
                last_entry.map_or(0, |last| last + 1)
            } else {
                DynUnsignedInteger::de(reader, entry_bits)
                    .map_err(ProtocolError::truncated(&name))?
                    .get()
            };
            last_entry = Some(index);

            if index >= u64::from(max_entries) {
                return Err(ProtocolError::IndexOutOfRange {
                    table: name,
                    index,
                    max_entries,
                });
            }
            let index = index as u32;

            // string, only sent for entries new to this consumer
            let mut received: Option<String> = None;
            if reader.read_bit().map_err(ProtocolError::truncated(&name))? {
                let dictionary_used = use_dictionary && reader.read_bit().map_err(ProtocolError::truncated(&name))?;

                if dictionary_used {
                    let dictionary_index = if reader.read_bit().map_err(ProtocolError::truncated(&name))? {
                        last_dictionary_index.map_or(0, |last| last + 1)
                    } else {
                        DynUnsignedInteger::de(reader, dictionary.encode_bits())
                            .map_err(ProtocolError::truncated(&name))?
                            .get()
                    };
                    last_dictionary_index = Some(dictionary_index);

                    let lookup = u32::try_from(dictionary_index)
                        .ok()
                        .and_then(|dictionary_index| dictionary.lookup(dictionary_index));
                    let Some(string) = lookup else {
                        return Err(ProtocolError::DictionaryIndexOutOfRange {
                            table: name,
                            index,
                            dictionary_index,
                            dictionary_len: dictionary.len(),
                        });
                    };
                    received = Some(string.to_string());
                } else if reader.read_bit().map_err(ProtocolError::truncated(&name))? {
                    let slot = DynUnsignedInteger::de(reader, SUBSTRING_BITS)
                        .map_err(ProtocolError::truncated(&name))?
                        .get() as u8;
                    let length = DynUnsignedInteger::de(reader, SUBSTRING_BITS)
                        .map_err(ProtocolError::truncated(&name))?
                        .get() as u8;
                    let remainder = String::de(reader).map_err(ProtocolError::truncated(&name))?;

                    let Some(previous) = history.get(slot) else {
                        return Err(ProtocolError::EmptyHistorySlot {
                            table: name,
                            index,
                            slot,
                        });
                    };
                    let Some(prefix) = previous.get(..usize::from(length)) else {
                        return Err(ProtocolError::InvalidSubstring {
                            table: name,
                            index,
                            slot,
                            length,
                        });
                    };
                    received = Some(format!("{prefix}{remainder}"));
                } else {
                    received = Some(String::de(reader).map_err(ProtocolError::truncated(&name))?);
                }
            }

            // payload
            let mut payload: Vec<u8> = Vec::new();
            if reader.read_bit().map_err(ProtocolError::truncated(&name))? {
                match layout {
                    PayloadLayout::Fixed { bytes, bits } => {
                        payload = reader
                            .read_bits(u32::from(bits))
                            .map_err(ProtocolError::truncated(&name))?;
                        payload.resize(usize::from(bytes), 0);
                    }
                    PayloadLayout::Variable => {
                        let length = DynUnsignedInteger::de(reader, MAX_PAYLOAD_BITS)
                            .map_err(ProtocolError::truncated(&name))?
                            .get() as usize;
                        if length > layout.max_size() {
                            return Err(ProtocolError::PayloadLengthExceeded {
                                table: name,
                                index,
                                length,
                                max: layout.max_size(),
                            });
                        }
                        payload = reader
                            .read_bits(length as u32 * 8)
                            .map_err(ProtocolError::truncated(&name))?;
                    }
                }
            }

            let count = table.num_strings();
            let string = if (index as usize) < count {
                let local = table
                    .string(StringIndex::Producer(index))
                    .unwrap_or_default()
                    .to_string();
                if let Some(received) = received {
                    if received != local {
                        return Err(ProtocolError::StringMismatch {
                            table: name,
                            index,
                            received,
                            local,
                        });
                    }
                }
                table
                    .set_payload(StringIndex::Producer(index), Some(payload.as_slice()))
                    .map_err(|err| rejected(&name, index, err))?;
                local
            } else {
                if index as usize != count {
                    return Err(ProtocolError::NonSequentialGrowth {
                        table: name,
                        index,
                        count,
                    });
                }
                let Some(received) = received else {
                    return Err(ProtocolError::MissingString { table: name, index });
                };
                if let Some(existing) = table.items().find(&received) {
                    return Err(ProtocolError::DuplicateString {
                        table: name,
                        string: received,
                        index,
                        existing,
                    });
                }
                table
                    .insert(TableRole::Producer, &received, Some(payload.as_slice()))
                    .map_err(|err| rejected(&name, index, err))?;
                received
            };

            history.push(&string);
        }

        Ok(())
    }
}

fn rejected(table: &str, index: u32, err: StringTableError) -> ProtocolError {
    match err {
        StringTableError::PayloadTooLarge { size, max, .. } => ProtocolError::PayloadLengthExceeded {
            table: table.to_string(),
            index,
            length: size,
            max,
        },
        StringTableError::PayloadSizeMismatch { size, expected, .. } => {
            ProtocolError::PayloadLengthExceeded {
                table: table.to_string(),
                index,
                length: size,
                max: expected,
            }
        }
        other => ProtocolError::Rejected {
            table: table.to_string(),
            index,
            reason: other.to_string(),
        },
    }
}
