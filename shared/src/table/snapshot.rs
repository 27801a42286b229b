use netstrings_serde::{BitReader, BitWrite, Serde, SignedVariableInteger, UnsignedVariableInteger};

use crate::types::{TableRole, Tick};

use super::{
    error::ProtocolError, index::StringIndex, item_list::ItemList, string_table::StringTable,
};

// Snapshot layout, per namespace:
//   count: UnsignedVariableInteger<7>
//   per item: name, tick_created, tick_changed, payload (Option of byte count
//   and bytes)
// The consumer namespace is preceded by a presence bit.

fn write_tick(writer: &mut dyn BitWrite, tick: Tick) {
    SignedVariableInteger::<15>::new(tick).ser(writer);
}

fn read_tick(reader: &mut BitReader, table: &str) -> Result<Tick, ProtocolError> {
    SignedVariableInteger::<15>::de(reader)
        .map_err(ProtocolError::truncated(table))?
        .to::<Tick>()
        .ok_or_else(|| ProtocolError::Rejected {
            table: table.to_string(),
            index: 0,
            reason: "tick out of range".to_string(),
        })
}

fn write_items(writer: &mut dyn BitWrite, items: &ItemList) {
    UnsignedVariableInteger::<7>::new(items.len() as i64).ser(writer);
    for (_, item) in items.iter() {
        item.name().to_string().ser(writer);
        write_tick(writer, item.tick_created());
        write_tick(writer, item.tick_changed());
        match item.payload() {
            Some(payload) => {
                writer.write_bit(true);
                UnsignedVariableInteger::<9>::new(payload.len() as i64).ser(writer);
                writer.write_bits(payload, payload.len() as u32 * 8);
            }
            None => writer.write_bit(false),
        }
    }
}

fn read_items(
    reader: &mut BitReader,
    table: &mut StringTable,
    role: TableRole,
) -> Result<(), ProtocolError> {
    let name = table.name().to_string();
    let count = UnsignedVariableInteger::<7>::de(reader)
        .map_err(ProtocolError::truncated(&name))?
        .get();

    for _ in 0..count {
        let string = String::de(reader).map_err(ProtocolError::truncated(&name))?;
        let tick_created = read_tick(reader, &name)?;
        let tick_changed = read_tick(reader, &name)?;
        let payload = if reader.read_bit().map_err(ProtocolError::truncated(&name))? {
            let length = UnsignedVariableInteger::<9>::de(reader)
                .map_err(ProtocolError::truncated(&name))?
                .get();
            let length = u32::try_from(length).unwrap_or(u32::MAX).saturating_mul(8);
            reader
                .read_bits(length)
                .map_err(ProtocolError::truncated(&name))?
        } else {
            Vec::new()
        };

        table.set_tick(tick_changed);
        let index = table
            .insert(role, &string, Some(payload.as_slice()))
            .map_err(|err| ProtocolError::Rejected {
                table: name.clone(),
                index: 0,
                reason: err.to_string(),
            })?;
        if index.role() != role {
            return Err(ProtocolError::Rejected {
                table: name,
                index: index.value(),
                reason: format!("{string} landed in the wrong namespace"),
            });
        }
        restore_ticks(table, index, tick_created, tick_changed);
    }

    Ok(())
}

fn restore_ticks(table: &mut StringTable, index: StringIndex, created: Tick, changed: Tick) {
    if let Some(item) = table.item_mut(index) {
        item.set_ticks(created, changed);
    }
}

impl StringTable {
    /// Saves both namespaces with their change ticks.
    pub fn write_snapshot(&self, writer: &mut dyn BitWrite) {
        write_tick(writer, self.tick());
        write_tick(writer, self.last_changed_tick());
        write_items(writer, self.items());
        match self.consumer_items() {
            Some(items) => {
                writer.write_bit(true);
                write_items(writer, items);
            }
            None => writer.write_bit(false),
        }
    }

    /// Replaces the contents of this table with a snapshot written by
    /// `write_snapshot`. On error the table is left as it was.
    pub fn read_snapshot(&mut self, reader: &mut BitReader) -> Result<(), ProtocolError> {
        let name = self.name().to_string();
        let tick = read_tick(reader, &name)?;
        let last_changed_tick = read_tick(reader, &name)?;

        let mut restored = self.empty_copy();
        read_items(reader, &mut restored, TableRole::Producer)?;

        let has_consumer = reader.read_bit().map_err(ProtocolError::truncated(&name))?;
        restored.set_allow_consumer_inserts(has_consumer);
        if has_consumer {
            read_items(reader, &mut restored, TableRole::Consumer)?;
        }

        restored.set_tick(tick);
        restored.set_last_changed_tick(last_changed_tick);
        self.replace_contents(restored);
        Ok(())
    }
}
