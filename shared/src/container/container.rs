use std::{collections::HashSet, sync::Arc};

use log::{debug, info, warn};

use netstrings_serde::{BitReader, BitWrite, BitWriter, Serde, UnsignedVariableInteger};

use crate::{
    constants::MAX_TABLES,
    dictionary::{dictionary::Dictionary, manager::DictionaryManager},
    table::{
        error::{ProtocolError, StringTableError},
        string_table::{PayloadLayout, StringTable, TableFlags},
    },
    types::{TableId, TableRole, Tick},
    StringTableConfig,
};

use super::{
    error::ContainerError,
    messages::{CreateStringTableMessage, UpdateStringTableMessage},
};

/// Owns every string table of one role and frames their updates for the
/// network.
pub struct StringTableContainer {
    role: TableRole,
    tables: Vec<StringTable>,
    tick: Tick,
    creation_allowed: bool,
    locked: bool,
    rollback_enabled: bool,
    dictionary: Arc<Dictionary>,
    config: StringTableConfig,
}

impl StringTableContainer {
    /// A container with no tables, the creation window closed and tables
    /// unlocked. Locking only gates warnings here, so callers lock around
    /// the phases where writes are unexpected instead of unlocking to write.
    pub fn new(role: TableRole, config: StringTableConfig) -> Self {
        Self {
            role,
            tables: Vec::new(),
            tick: 0,
            creation_allowed: false,
            locked: false,
            rollback_enabled: false,
            dictionary: Arc::new(Dictionary::empty()),
            config,
        }
    }

    pub fn role(&self) -> TableRole {
        self.role
    }

    pub fn config(&self) -> &StringTableConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    // Lifecycle

    /// Opens or closes the window during which tables may be created.
    pub fn allow_creation(&mut self, allow: bool) {
        self.creation_allowed = allow;
    }

    pub fn is_creation_allowed(&self) -> bool {
        self.creation_allowed
    }

    /// Locks every table. Returns the previous lock state.
    pub fn lock(&mut self, locked: bool) -> bool {
        for table in self.tables.iter_mut() {
            table.lock(locked);
        }
        std::mem::replace(&mut self.locked, locked)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
        for table in self.tables.iter_mut() {
            table.set_tick(tick);
        }
    }

    pub fn create_table(
        &mut self,
        name: &str,
        max_entries: u32,
        payload_layout: PayloadLayout,
        flags: TableFlags,
    ) -> Result<TableId, ContainerError> {
        if !self.creation_allowed {
            return Err(ContainerError::WrongPhase {
                name: name.to_string(),
            });
        }
        if self.find_table_id(name).is_some() {
            return Err(ContainerError::DuplicateName {
                name: name.to_string(),
            });
        }
        if self.tables.len() >= MAX_TABLES {
            return Err(ContainerError::TooManyTables {
                name: name.to_string(),
                max: MAX_TABLES,
            });
        }

        let Ok(id) = TableId::try_from(self.tables.len()) else {
            return Err(ContainerError::TooManyTables {
                name: name.to_string(),
                max: MAX_TABLES,
            });
        };

        let mut table = StringTable::new(
            id,
            name,
            max_entries,
            payload_layout,
            flags,
            self.dictionary.clone(),
            self.config.clone(),
        )
        .map_err(|err| match err {
            StringTableError::InvalidConfiguration { table, reason } => {
                ContainerError::InvalidConfiguration {
                    name: table,
                    reason,
                }
            }
            other => ContainerError::Table(other),
        })?;

        table.set_tick(self.tick);
        table.lock(self.locked);
        if self.rollback_enabled {
            table.enable_rollback()?;
        }

        debug!(
            "Created string table {} ({}, {} entries)",
            name, id, max_entries
        );
        self.tables.push(table);
        Ok(id)
    }

    // Lookup

    pub fn table(&self, id: TableId) -> Option<&StringTable> {
        self.tables.get(usize::from(id))
    }

    pub fn table_mut(&mut self, id: TableId) -> Option<&mut StringTable> {
        self.tables.get_mut(usize::from(id))
    }

    /// Table names compare case-insensitively.
    pub fn find_table(&self, name: &str) -> Option<&StringTable> {
        self.tables
            .iter()
            .find(|table| table.name().eq_ignore_ascii_case(name))
    }

    pub fn find_table_mut(&mut self, name: &str) -> Option<&mut StringTable> {
        self.tables
            .iter_mut()
            .find(|table| table.name().eq_ignore_ascii_case(name))
    }

    pub fn find_table_id(&self, name: &str) -> Option<TableId> {
        self.find_table(name).map(StringTable::id)
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> impl Iterator<Item = &StringTable> {
        self.tables.iter()
    }

    /// Drops every table. Used between levels.
    pub fn remove_all_tables(&mut self) {
        self.tables.clear();
    }

    pub fn set_allow_consumer_inserts(
        &mut self,
        id: TableId,
        allow: bool,
    ) -> Result<(), ContainerError> {
        let Some(table) = self.table_mut(id) else {
            return Err(ContainerError::TableNotFound { table_id: id });
        };
        table.set_allow_consumer_inserts(allow);
        Ok(())
    }

    // Dictionary

    /// Swaps the dictionary of the container and every table in it.
    pub fn set_dictionary(&mut self, dictionary: Arc<Dictionary>) {
        for table in self.tables.iter_mut() {
            table.set_dictionary(dictionary.clone());
        }
        self.dictionary = dictionary;
    }

    pub fn update_dictionary_strings(&mut self) {
        for table in self.tables.iter_mut() {
            table.update_dictionary_strings();
        }
    }

    /// Collects the strings of every dictionary-enabled table and hands them
    /// to `manager` to be written when `level` unloads.
    pub fn create_dictionary(&self, level: &str, manager: &mut DictionaryManager) {
        let mut seen = HashSet::new();
        let strings: Vec<&str> = self
            .tables
            .iter()
            .filter(|table| table.uses_dictionary())
            .flat_map(|table| table.items().iter().map(|(_, item)| item.name()))
            .filter(|name| seen.insert(*name))
            .collect();

        info!(
            "Creating stringtable dictionary for {} ({} strings)",
            level,
            strings.len()
        );
        manager.cache_for_write_on_unload(level, Dictionary::serialize(strings));
    }

    // Updates

    pub fn write_updates_for_consumer(
        &self,
        last_ack_tick: Tick,
        writer: &mut BitWriter,
    ) -> Result<usize, ContainerError> {
        self.write_updates(last_ack_tick, writer, true)
    }

    /// Frames the update of every table changed after `last_ack_tick`.
    /// Returns the number of tables written.
    pub fn write_updates(
        &self,
        last_ack_tick: Tick,
        writer: &mut BitWriter,
        allow_dictionary: bool,
    ) -> Result<usize, ContainerError> {
        // terminator
        writer.reserve_bits(1);

        let mut tables_written = 0;
        for table in self.tables.iter() {
            if !table.changed_since_tick(last_ack_tick) {
                continue;
            }

            let mut scratch = BitWriter::with_max_bytes(self.config.update_scratch_bytes);
            let num_changed = if allow_dictionary {
                table.write_update(&mut scratch, last_ack_tick)
            } else {
                table.write_update_without_dictionary(&mut scratch, last_ack_tick)
            };
            if scratch.overflowed() {
                writer.release_bits(1);
                warn!(
                    "Table {} update overflowed its {} byte budget",
                    table.name(),
                    self.config.update_scratch_bytes
                );
                return Err(ContainerError::UpdateOverflow {
                    table: table.name().to_string(),
                    bits: scratch.bits_written(),
                });
            }
            if num_changed == 0 {
                continue;
            }

            let Ok(num_changed) = u32::try_from(num_changed) else {
                writer.release_bits(1);
                return Err(ContainerError::UpdateOverflow {
                    table: table.name().to_string(),
                    bits: scratch.bits_written(),
                });
            };
            let message = UpdateStringTableMessage::new(table.id(), num_changed, scratch);
            Self::write_framed(writer, table.name(), &message)?;
            tables_written += 1;
        }

        writer.release_bits(1);
        writer.write_bit(false);
        Ok(tables_written)
    }

    /// Applies every framed table update in `reader`. Returns the number of
    /// tables updated.
    pub fn read_updates(&mut self, reader: &mut BitReader) -> Result<usize, ContainerError> {
        let mut tables_read = 0;
        while reader
            .read_bit()
            .map_err(ProtocolError::truncated("update"))?
        {
            let message =
                UpdateStringTableMessage::de(reader).map_err(ProtocolError::truncated("update"))?;
            let Some(table) = self.tables.get_mut(usize::from(message.table_id)) else {
                return Err(ProtocolError::UnknownTable {
                    table: message.table_id.to_string(),
                }
                .into());
            };

            table.parse_update(&mut message.reader(), message.num_changed_entries as usize)?;
            tables_read += 1;
        }
        Ok(tables_read)
    }

    // Baselines

    /// Writes the definition and full contents of every table, for a consumer
    /// that just connected. Caches a rebuilt dictionary first when `manager`
    /// asks for one.
    pub fn write_baselines(
        &self,
        level: &str,
        manager: &mut DictionaryManager,
        writer: &mut BitWriter,
    ) -> Result<usize, ContainerError> {
        if manager.should_rebuild(level) {
            self.create_dictionary(level, manager);
        }

        writer.reserve_bits(1);

        for table in self.tables.iter() {
            let mut scratch = BitWriter::with_max_bytes(self.config.baseline_scratch_bytes);
            let written = table.write_baseline(&mut scratch);
            if scratch.overflowed() {
                writer.release_bits(1);
                warn!(
                    "Table {} baseline overflowed its {} byte budget",
                    table.name(),
                    self.config.baseline_scratch_bytes
                );
                return Err(ContainerError::UpdateOverflow {
                    table: table.name().to_string(),
                    bits: scratch.bits_written(),
                });
            }
            if written != table.num_strings() {
                writer.release_bits(1);
                return Err(ContainerError::BaselineIncomplete {
                    table: table.name().to_string(),
                    written,
                    expected: table.num_strings(),
                });
            }

            if self.config.dump_tables {
                info!(
                    "Baseline for {}: {} strings, {} bits",
                    table.name(),
                    written,
                    scratch.bits_written()
                );
            }

            let message = CreateStringTableMessage {
                name: table.name().to_string(),
                max_entries: table.max_strings(),
                num_entries: u32::try_from(written).unwrap_or(u32::MAX),
                flags: table.flags(),
                payload_layout: table.payload_layout(),
                data_bits: scratch.bits_written(),
                data: scratch.to_bytes(),
            };
            Self::write_framed(writer, table.name(), &message)?;
        }

        writer.release_bits(1);
        writer.write_bit(false);
        Ok(self.tables.len())
    }

    /// Creates every table described in `reader` and fills it with its
    /// baseline. The creation window is opened for the duration of the call.
    pub fn read_baselines(&mut self, reader: &mut BitReader) -> Result<usize, ContainerError> {
        let creation_allowed = std::mem::replace(&mut self.creation_allowed, true);
        let result = self.read_baseline_messages(reader);
        self.creation_allowed = creation_allowed;
        result
    }

    fn read_baseline_messages(&mut self, reader: &mut BitReader) -> Result<usize, ContainerError> {
        let mut tables_read = 0;
        while reader
            .read_bit()
            .map_err(ProtocolError::truncated("baseline"))?
        {
            let message = CreateStringTableMessage::de(reader)
                .map_err(ProtocolError::truncated("baseline"))?;

            let id = self
                .create_table(
                    &message.name,
                    message.max_entries,
                    message.payload_layout,
                    message.flags,
                )
                .map_err(|err| ProtocolError::TableCreation {
                    table: message.name.clone(),
                    reason: err.to_string(),
                })?;
            let Some(table) = self.tables.get_mut(usize::from(id)) else {
                return Err(ProtocolError::UnknownTable {
                    table: message.name,
                }
                .into());
            };

            table.parse_update(&mut message.reader(), message.num_entries as usize)?;
            tables_read += 1;
        }
        Ok(tables_read)
    }

    fn write_framed<M: Serde>(
        writer: &mut BitWriter,
        table: &str,
        message: &M,
    ) -> Result<(), ContainerError> {
        let mut counter = writer.counter();
        counter.write_bit(true);
        message.ser(&mut counter);
        if counter.overflowed() {
            writer.release_bits(1);
            warn!("Table {} doesn't fit in the outgoing message", table);
            return Err(ContainerError::UpdateOverflow {
                table: table.to_string(),
                bits: counter.bits_needed(),
            });
        }

        writer.write_bit(true);
        message.ser(writer);
        Ok(())
    }

    // Mirrors & rollback

    /// Pushes recent changes of every table into its mirrors.
    pub fn direct_update(&self, last_propagated_tick: Tick) -> Result<(), ContainerError> {
        for table in self.tables.iter() {
            table.direct_update(last_propagated_tick)?;
        }
        Ok(())
    }

    /// Tables created from now on keep a payload history. Must be called
    /// before any table exists.
    pub fn enable_rollback(&mut self, enabled: bool) -> Result<(), ContainerError> {
        if !self.tables.is_empty() {
            return Err(ContainerError::RollbackAfterCreation {
                count: self.tables.len(),
            });
        }
        self.rollback_enabled = enabled;
        Ok(())
    }

    pub fn is_rollback_enabled(&self) -> bool {
        self.rollback_enabled
    }

    pub fn restore_tick(&mut self, tick: Tick) {
        self.tick = tick;
        for table in self.tables.iter_mut() {
            table.set_tick(tick);
            table.restore_tick(tick);
        }
    }

    pub fn trigger_callbacks(&mut self, tick_ack: Tick) {
        for table in self.tables.iter_mut() {
            table.trigger_callbacks(tick_ack);
        }
    }

    // Snapshots

    pub fn write_snapshots(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.tables.len() as u32).ser(writer);
        for table in self.tables.iter() {
            table.name().to_string().ser(writer);
            table.write_snapshot(writer);
        }
    }

    /// Restores tables saved by `write_snapshots`. Every saved table must
    /// already exist in this container.
    pub fn read_snapshots(&mut self, reader: &mut BitReader) -> Result<usize, ContainerError> {
        let count = UnsignedVariableInteger::<7>::de(reader)
            .map_err(ProtocolError::truncated("snapshot"))?
            .get();

        for _ in 0..count {
            let name = String::de(reader).map_err(ProtocolError::truncated("snapshot"))?;
            let Some(table) = self.find_table_mut(&name) else {
                return Err(ProtocolError::UnknownTable { table: name }.into());
            };
            table.read_snapshot(reader)?;
        }

        Ok(self.tables.len())
    }

    // Diagnostics

    pub fn dump(&self) {
        let mut total = 0;
        for table in self.tables.iter() {
            table.dump();
            total += table.num_strings();
        }
        info!("{} tables, {} strings total", self.tables.len(), total);
    }
}
