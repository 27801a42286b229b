use std::{ops::BitOr, sync::Arc};

use log::{info, warn};

use netstrings_serde::{BitReader, BitWrite};

use crate::{
    constants::{MAX_PAYLOAD_BITS, MAX_PAYLOAD_SIZE, MAX_TABLE_ENTRIES, MIRROR_TABLE_MAX_COUNT},
    dictionary::dictionary::Dictionary,
    types::{TableId, TableRole, Tick, BASELINE_TICK},
    StringTableConfig,
};

use super::{
    error::{ProtocolError, StringTableError},
    index::StringIndex,
    item::StringTableItem,
    item_list::ItemList,
    mirror::{push_into_mirror, MirrorTable},
    table_reader::StringTableReader,
    table_writer::StringTableWriter,
};

/// How payloads of a table are sized on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadLayout {
    /// Up to `MAX_PAYLOAD_SIZE` bytes, sent with a length prefix
    Variable,
    /// Exactly `bytes` bytes, of which only the low `bits` bits are sent
    Fixed { bytes: u16, bits: u8 },
}

impl PayloadLayout {
    pub fn is_fixed(&self) -> bool {
        matches!(self, PayloadLayout::Fixed { .. })
    }

    /// Largest payload accepted, in bytes.
    pub fn max_size(&self) -> usize {
        match self {
            PayloadLayout::Variable => MAX_PAYLOAD_SIZE,
            PayloadLayout::Fixed { bytes, .. } => usize::from(*bytes),
        }
    }

    fn validate(&self) -> Result<(), String> {
        let PayloadLayout::Fixed { bytes, bits } = *self else {
            return Ok(());
        };
        if bytes == 0 || bits == 0 {
            return Err("fixed payloads need a non-zero size".to_string());
        }
        if bits > MAX_PAYLOAD_BITS {
            return Err(format!(
                "fixed payload of {bits} bits exceeds the {MAX_PAYLOAD_BITS} bit budget"
            ));
        }
        if u32::from(bits) > u32::from(bytes) * 8 {
            return Err(format!("{bits} payload bits don't fit in {bytes} bytes"));
        }
        Ok(())
    }
}

/// Per-table options sent along with the table definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TableFlags(u8);

impl TableFlags {
    pub const NONE: TableFlags = TableFlags(0);
    pub const DICTIONARY_ENABLED: TableFlags = TableFlags(1);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: TableFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TableFlags {
    type Output = TableFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        TableFlags(self.0 | rhs.0)
    }
}

/// Passed to the change callback whenever a string is added or its payload
/// changes.
#[derive(Clone, Copy, Debug)]
pub struct StringChange<'a> {
    pub table: &'a str,
    pub index: StringIndex,
    pub name: &'a str,
    pub payload: Option<&'a [u8]>,
}

pub type StringChangeCallback = Box<dyn FnMut(StringChange<'_>) + Send + Sync>;

/// Bits needed to address every entry of a table holding `max_entries`.
pub fn entry_bits_for(max_entries: u32) -> Result<u8, String> {
    if max_entries == 0 || !max_entries.is_power_of_two() {
        return Err(format!("{max_entries} entries is not a power of two"));
    }
    if max_entries > MAX_TABLE_ENTRIES {
        return Err(format!(
            "{max_entries} entries exceeds the limit of {MAX_TABLE_ENTRIES}"
        ));
    }
    Ok(max_entries.trailing_zeros() as u8)
}

/// Zeroes every bit past `bits`.
fn mask_bits(payload: &[u8], bits: u8) -> Vec<u8> {
    let bits = usize::from(bits);
    payload
        .iter()
        .enumerate()
        .map(|(i, byte)| {
            let start = i * 8;
            if start >= bits {
                0
            } else if bits - start < 8 {
                byte & ((1u8 << (bits - start)) - 1)
            } else {
                *byte
            }
        })
        .collect()
}

/// A named, bounded, ordered set of strings with optional payloads, kept in
/// sync between a producer and its consumers.
pub struct StringTable {
    id: TableId,
    name: String,
    max_entries: u32,
    entry_bits: u8,
    payload_layout: PayloadLayout,
    flags: TableFlags,
    items: ItemList,
    consumer_items: Option<ItemList>,
    tick: Tick,
    last_changed_tick: Tick,
    locked: bool,
    change_history_enabled: bool,
    change_callback: Option<StringChangeCallback>,
    mirrors: [Option<MirrorTable>; MIRROR_TABLE_MAX_COUNT],
    dictionary: Arc<Dictionary>,
    config: StringTableConfig,
}

impl StringTable {
    pub fn new(
        id: TableId,
        name: &str,
        max_entries: u32,
        payload_layout: PayloadLayout,
        flags: TableFlags,
        dictionary: Arc<Dictionary>,
        config: StringTableConfig,
    ) -> Result<Self, StringTableError> {
        let invalid = |reason: String| StringTableError::InvalidConfiguration {
            table: name.to_string(),
            reason,
        };
        let entry_bits = entry_bits_for(max_entries).map_err(invalid)?;
        payload_layout.validate().map_err(invalid)?;

        Ok(Self {
            id,
            name: name.to_string(),
            max_entries,
            entry_bits,
            payload_layout,
            flags,
            items: ItemList::new(),
            consumer_items: None,
            tick: 0,
            last_changed_tick: 0,
            locked: false,
            change_history_enabled: false,
            change_callback: None,
            mirrors: Default::default(),
            dictionary,
            config,
        })
    }

    // Accessors

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_strings(&self) -> u32 {
        self.max_entries
    }

    pub fn entry_bits(&self) -> u8 {
        self.entry_bits
    }

    pub fn payload_layout(&self) -> PayloadLayout {
        self.payload_layout
    }

    pub fn flags(&self) -> TableFlags {
        self.flags
    }

    pub fn uses_dictionary(&self) -> bool {
        self.flags.contains(TableFlags::DICTIONARY_ENABLED)
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    pub fn config(&self) -> &StringTableConfig {
        &self.config
    }

    /// Number of producer strings.
    pub fn num_strings(&self) -> usize {
        self.items.len()
    }

    pub fn num_consumer_strings(&self) -> usize {
        self.consumer_items.as_ref().map_or(0, ItemList::len)
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    pub fn consumer_items(&self) -> Option<&ItemList> {
        self.consumer_items.as_ref()
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    pub fn last_changed_tick(&self) -> Tick {
        self.last_changed_tick
    }

    pub(crate) fn set_last_changed_tick(&mut self, tick: Tick) {
        self.last_changed_tick = tick;
    }

    pub fn changed_since_tick(&self, tick: Tick) -> bool {
        self.last_changed_tick > tick
    }

    /// Returns the previous lock state.
    pub fn lock(&mut self, locked: bool) -> bool {
        std::mem::replace(&mut self.locked, locked)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_rollback_enabled(&self) -> bool {
        self.change_history_enabled
    }

    pub fn item(&self, index: StringIndex) -> Option<&StringTableItem> {
        match index {
            StringIndex::Producer(index) => self.items.get(index),
            StringIndex::Consumer(index) => self.consumer_items.as_ref()?.get(index),
        }
    }

    pub(crate) fn item_mut(&mut self, index: StringIndex) -> Option<&mut StringTableItem> {
        match index {
            StringIndex::Producer(index) => self.items.get_mut(index),
            StringIndex::Consumer(index) => self.consumer_items.as_mut()?.get_mut(index),
        }
    }

    pub fn string(&self, index: StringIndex) -> Option<&str> {
        self.item(index).map(StringTableItem::name)
    }

    pub fn payload(&self, index: StringIndex) -> Option<&[u8]> {
        self.item(index)?.payload()
    }

    /// Looks `name` up in the producer namespace, then in the consumer
    /// namespace when consumer inserts are allowed.
    pub fn find(&self, name: &str) -> Option<StringIndex> {
        if let Some(index) = self.items.find(name) {
            return Some(StringIndex::Producer(index));
        }
        self.consumer_items
            .as_ref()?
            .find(name)
            .map(StringIndex::Consumer)
    }

    // Mutation

    /// Adds `name` unless present and applies `payload` when one is given.
    /// `Some(&[])` clears the payload, `None` leaves it untouched.
    pub fn insert(
        &mut self,
        role: TableRole,
        name: &str,
        payload: Option<&[u8]>,
    ) -> Result<StringIndex, StringTableError> {
        if self.locked {
            warn!("Table {} is locked, adding {}", self.name, name);
        }

        let role = match role {
            TableRole::Consumer if self.consumer_items.is_none() => {
                if self.items.find(name).is_none() {
                    warn!(
                        "Consumer added {} to table {} without consumer inserts enabled",
                        name, self.name
                    );
                }
                TableRole::Producer
            }
            role => role,
        };

        let stored = match payload {
            Some(payload) => Some(self.normalize_payload(name, payload)?),
            None => None,
        };

        let existing = match role {
            TableRole::Producer => self.items.find(name),
            TableRole::Consumer => self.consumer_items.as_ref().and_then(|list| list.find(name)),
        };

        let (index, mut changed) = match existing {
            Some(index) => (StringIndex::new(role, index), false),
            None => (self.push_item(role, name)?, true),
        };

        if let Some(stored) = stored {
            let tick = self.tick;
            if let Some(item) = self.item_mut(index) {
                changed |= item.set_payload(tick, stored.as_deref());
            }
        }

        if changed {
            self.data_changed(index);
        }

        Ok(index)
    }

    fn push_item(&mut self, role: TableRole, name: &str) -> Result<StringIndex, StringTableError> {
        let keep_history = self.change_history_enabled;
        let tick = self.tick;
        let max_entries = self.max_entries;

        let list = match role {
            TableRole::Producer => &mut self.items,
            TableRole::Consumer => match self.consumer_items.as_mut() {
                Some(list) => list,
                None => &mut self.items,
            },
        };

        if list.len() >= max_entries as usize {
            warn!("Table {} is full, can't add {}", self.name, name);
            return Err(StringTableError::TableFull {
                table: self.name.clone(),
                string: name.to_string(),
                max_entries,
            });
        }

        let index = list.push(name, tick, keep_history);

        if role == TableRole::Producer && self.uses_dictionary() {
            let dictionary_index = self.dictionary.find_exact(name);
            if let Some(item) = self.items.get_mut(index) {
                item.set_dictionary_index(dictionary_index);
            }
        }

        Ok(StringIndex::new(role, index))
    }

    /// Replaces the payload at `index`. Returns whether anything changed.
    pub fn set_payload(
        &mut self,
        index: StringIndex,
        payload: Option<&[u8]>,
    ) -> Result<bool, StringTableError> {
        if self.locked {
            warn!("Table {} is locked, changing entry {}", self.name, index);
        }

        let Some(item) = self.item(index) else {
            return Err(StringTableError::InvalidIndex {
                table: self.name.clone(),
                index,
            });
        };
        let stored = self.normalize_payload(item.name(), payload.unwrap_or(&[]))?;

        let tick = self.tick;
        let changed = self
            .item_mut(index)
            .is_some_and(|item| item.set_payload(tick, stored.as_deref()));

        if changed {
            self.data_changed(index);
        }
        Ok(changed)
    }

    /// Validates a payload against the layout. Empty payloads become `None`.
    fn normalize_payload(
        &self,
        name: &str,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, StringTableError> {
        if payload.is_empty() {
            return Ok(None);
        }

        let max = self.payload_layout.max_size();
        if payload.len() > max {
            return Err(StringTableError::PayloadTooLarge {
                table: self.name.clone(),
                string: name.to_string(),
                size: payload.len(),
                max,
            });
        }

        match self.payload_layout {
            PayloadLayout::Variable => Ok(Some(payload.to_vec())),
            PayloadLayout::Fixed { bytes, bits } => {
                if payload.len() != usize::from(bytes) {
                    return Err(StringTableError::PayloadSizeMismatch {
                        table: self.name.clone(),
                        string: name.to_string(),
                        size: payload.len(),
                        expected: usize::from(bytes),
                    });
                }
                Ok(Some(mask_bits(payload, bits)))
            }
        }
    }

    fn data_changed(&mut self, index: StringIndex) {
        self.last_changed_tick = self.tick;

        if self.change_history_enabled {
            return;
        }

        let Some(callback) = self.change_callback.as_mut() else {
            return;
        };
        let item = match index {
            StringIndex::Producer(index) => self.items.get(index),
            StringIndex::Consumer(index) => self.consumer_items.as_ref().and_then(|list| list.get(index)),
        };
        if let Some(item) = item {
            callback(StringChange {
                table: &self.name,
                index,
                name: item.name(),
                payload: item.payload(),
            });
        }
    }

    /// An empty table of the same shape, dictionary and rollback mode, with
    /// no callback or mirrors.
    pub(crate) fn empty_copy(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            max_entries: self.max_entries,
            entry_bits: self.entry_bits,
            payload_layout: self.payload_layout,
            flags: self.flags,
            items: ItemList::new(),
            consumer_items: None,
            tick: 0,
            last_changed_tick: 0,
            locked: false,
            change_history_enabled: self.change_history_enabled,
            change_callback: None,
            mirrors: Default::default(),
            dictionary: self.dictionary.clone(),
            config: self.config.clone(),
        }
    }

    /// Takes the strings and ticks of `other`, keeping this table's callback,
    /// mirrors and lock.
    pub(crate) fn replace_contents(&mut self, other: StringTable) {
        self.items = other.items;
        self.consumer_items = other.consumer_items;
        self.tick = other.tick;
        self.last_changed_tick = other.last_changed_tick;
    }

    /// Empties both namespaces. The table itself stays registered.
    pub fn delete_all_strings(&mut self) {
        self.items.clear();
        if let Some(list) = self.consumer_items.as_mut() {
            list.clear();
        }
        self.last_changed_tick = self.tick;
    }

    /// Gives the table a consumer-local namespace, or drops it along with its
    /// strings.
    pub fn set_allow_consumer_inserts(&mut self, allow: bool) {
        match (allow, self.consumer_items.is_some()) {
            (true, false) => self.consumer_items = Some(ItemList::new()),
            (false, true) => self.consumer_items = None,
            _ => {}
        }
    }

    pub fn allows_consumer_inserts(&self) -> bool {
        self.consumer_items.is_some()
    }

    pub fn set_change_callback(&mut self, callback: StringChangeCallback) {
        self.change_callback = Some(callback);
    }

    pub fn clear_change_callback(&mut self) {
        self.change_callback = None;
    }

    // Rollback

    /// Keeps a bounded payload history on every item and defers callbacks to
    /// `trigger_callbacks`. Only allowed on an empty table.
    pub fn enable_rollback(&mut self) -> Result<(), StringTableError> {
        if !self.items.is_empty() {
            return Err(StringTableError::RollbackNotEmpty {
                table: self.name.clone(),
                count: self.items.len(),
            });
        }
        self.change_history_enabled = true;
        Ok(())
    }

    /// Rolls every producer payload back to its value as of `tick`.
    pub fn restore_tick(&mut self, tick: Tick) {
        let mut last_changed_tick = 0;
        for item in self.items.iter_mut() {
            last_changed_tick = last_changed_tick.max(item.restore_tick(tick));
        }
        self.last_changed_tick = last_changed_tick;
    }

    /// Fires the callback for every producer string changed after `tick_ack`.
    pub fn trigger_callbacks(&mut self, tick_ack: Tick) {
        let Some(callback) = self.change_callback.as_mut() else {
            return;
        };

        for (index, item) in self.items.iter() {
            if item.tick_changed() <= tick_ack {
                continue;
            }
            callback(StringChange {
                table: &self.name,
                index: StringIndex::Producer(index),
                name: item.name(),
                payload: item.payload(),
            });
        }
    }

    /// Fills an empty table with the producer strings of `other`, keeping
    /// their change ticks.
    pub fn copy_from(&mut self, other: &StringTable) -> Result<(), StringTableError> {
        if !self.items.is_empty() {
            return Err(StringTableError::CopyIntoNonEmpty {
                table: self.name.clone(),
                count: self.items.len(),
            });
        }

        let tick = self.tick;
        for (_, item) in other.items.iter() {
            self.tick = item.tick_changed();
            self.insert(TableRole::Producer, item.name(), Some(item.payload().unwrap_or(&[])))?;
        }
        self.tick = tick;
        Ok(())
    }

    // Dictionary

    pub fn set_dictionary(&mut self, dictionary: Arc<Dictionary>) {
        self.dictionary = dictionary;
        self.update_dictionary_strings();
    }

    /// Re-resolves the cached dictionary index of every producer string.
    pub fn update_dictionary_strings(&mut self) {
        let uses_dictionary = self.uses_dictionary();
        let dictionary = self.dictionary.clone();
        for item in self.items.iter_mut() {
            let index = if uses_dictionary {
                dictionary.find_exact(item.name())
            } else {
                None
            };
            item.set_dictionary_index(index);
        }
    }

    // Codec

    /// Encodes every producer string changed after `last_ack_tick`. Returns
    /// the number of entries written.
    pub fn write_update(&self, writer: &mut dyn BitWrite, last_ack_tick: Tick) -> usize {
        StringTableWriter::new(self).write(writer, last_ack_tick, true)
    }

    /// Like `write_update`, for consumers that can't use the dictionary.
    pub fn write_update_without_dictionary(
        &self,
        writer: &mut dyn BitWrite,
        last_ack_tick: Tick,
    ) -> usize {
        StringTableWriter::new(self).write(writer, last_ack_tick, false)
    }

    /// Full state, as seen by a consumer that acknowledged nothing.
    pub fn write_baseline(&self, writer: &mut dyn BitWrite) -> usize {
        self.write_update(writer, BASELINE_TICK)
    }

    pub fn parse_update(
        &mut self,
        reader: &mut BitReader,
        entry_count: usize,
    ) -> Result<(), ProtocolError> {
        StringTableReader::new(self).read(reader, entry_count)
    }

    // Mirrors

    pub fn set_mirror_table(
        &mut self,
        slot: usize,
        mirror: Option<MirrorTable>,
    ) -> Result<(), StringTableError> {
        let Some(entry) = self.mirrors.get_mut(slot) else {
            return Err(StringTableError::InvalidMirrorSlot {
                table: self.name.clone(),
                slot,
            });
        };
        *entry = mirror;
        Ok(())
    }

    pub fn mirror_table(&self, slot: usize) -> Option<&MirrorTable> {
        self.mirrors.get(slot)?.as_ref()
    }

    /// Pushes every producer string changed after `last_propagated_tick` into
    /// the registered mirrors, stamped with this table's tick.
    pub fn direct_update(&self, last_propagated_tick: Tick) -> Result<(), StringTableError> {
        for (slot, mirror) in self.mirrors.iter().enumerate() {
            let Some(mirror) = mirror else {
                continue;
            };
            let Ok(mut mirror) = mirror.write() else {
                return Err(StringTableError::MirrorUnavailable {
                    table: self.name.clone(),
                    slot,
                });
            };
            push_into_mirror(self, &mut mirror, last_propagated_tick)?;
        }
        Ok(())
    }

    // Diagnostics

    pub fn dump(&self) {
        info!("Table {}", self.name);
        for (index, item) in self.items.iter() {
            info!(
                "{:5} : {} ({} bytes)",
                index,
                item.name(),
                item.payload().map_or(0, <[u8]>::len)
            );
        }
        if let Some(list) = self.consumer_items.as_ref() {
            for (index, item) in list.iter() {
                info!(
                    "{:5} : {} ({} bytes, consumer)",
                    index,
                    item.name(),
                    item.payload().map_or(0, <[u8]>::len)
                );
            }
        }
        info!(
            "Table {}: {}/{} strings",
            self.name,
            self.items.len(),
            self.max_entries
        );
    }
}
