use std::sync::Arc;

use netstrings_serde::BitWriter;
use netstrings_shared::{
    Dictionary, DictionaryLocation, DictionaryManager, MemoryDictionaryStore, PayloadLayout,
    StringIndex, StringTable, StringTableConfig, StringTableContainer, TableFlags, TableId,
    TableRole, Tick,
};

/// Producer-side container for one level, with its dictionary manager
pub struct TestProducer {
    container: StringTableContainer,
    dictionaries: DictionaryManager,
    level: String,
}

impl TestProducer {
    pub fn new(level: &str) -> Self {
        Self::with_store(level, MemoryDictionaryStore::new(), StringTableConfig::default())
    }

    /// Producer whose level ships a dictionary holding `strings`.
    pub fn with_dictionary(level: &str, strings: &[&str]) -> Self {
        let store = MemoryDictionaryStore::new();
        store.insert(
            level,
            DictionaryLocation::Primary,
            Dictionary::serialize(strings.iter().copied()),
        );
        Self::with_store(level, store, StringTableConfig::default())
    }

    pub fn with_store(level: &str, store: MemoryDictionaryStore, config: StringTableConfig) -> Self {
        let mut dictionaries = DictionaryManager::new(Box::new(store), config.clone());
        dictionaries.on_level_load_start(level, None);

        let mut container = StringTableContainer::new(TableRole::Producer, config);
        container.set_dictionary(dictionaries.dictionary());
        container.allow_creation(true);

        Self {
            container,
            dictionaries,
            level: level.to_string(),
        }
    }

    pub fn container(&self) -> &StringTableContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut StringTableContainer {
        &mut self.container
    }

    pub fn dictionaries(&mut self) -> &mut DictionaryManager {
        &mut self.dictionaries
    }

    pub fn dictionary(&self) -> Arc<Dictionary> {
        self.container.dictionary().clone()
    }

    pub fn create_table(
        &mut self,
        name: &str,
        max_entries: u32,
        payload_layout: PayloadLayout,
        flags: TableFlags,
    ) -> TableId {
        self.container
            .create_table(name, max_entries, payload_layout, flags)
            .expect("table creation")
    }

    pub fn table(&self, id: TableId) -> &StringTable {
        self.container.table(id).expect("table exists")
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut StringTable {
        self.container.table_mut(id).expect("table exists")
    }

    pub fn insert(&mut self, id: TableId, name: &str, payload: Option<&[u8]>) -> StringIndex {
        self.table_mut(id)
            .insert(TableRole::Producer, name, payload)
            .expect("insert")
    }

    pub fn tick(&self) -> Tick {
        self.container.tick()
    }

    pub fn advance_tick(&mut self) -> Tick {
        let tick = self.container.tick() + 1;
        self.container.set_tick(tick);
        tick
    }

    pub fn baselines(&mut self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.container
            .write_baselines(&self.level, &mut self.dictionaries, &mut writer)
            .expect("baselines fit");
        writer.to_bytes()
    }

    pub fn updates_since(&self, last_ack_tick: Tick) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.container
            .write_updates_for_consumer(last_ack_tick, &mut writer)
            .expect("updates fit");
        writer.to_bytes()
    }
}
