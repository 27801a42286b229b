use std::sync::Arc;

use netstrings_serde::BitReader;
use netstrings_shared::{
    ContainerError, Dictionary, StringTable, StringTableConfig, StringTableContainer, TableRole,
    Tick, BASELINE_TICK,
};

/// Consumer-side container tracking the last tick it acknowledged
pub struct TestConsumer {
    container: StringTableContainer,
    last_ack: Tick,
}

impl TestConsumer {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        let mut container =
            StringTableContainer::new(TableRole::Consumer, StringTableConfig::default());
        container.set_dictionary(dictionary);
        Self {
            container,
            last_ack: BASELINE_TICK,
        }
    }

    pub fn container(&self) -> &StringTableContainer {
        &self.container
    }

    pub fn table(&self, name: &str) -> &StringTable {
        self.container.find_table(name).expect("table received")
    }

    pub fn last_ack(&self) -> Tick {
        self.last_ack
    }

    pub fn ack(&mut self, tick: Tick) {
        self.last_ack = tick;
    }

    pub fn receive_baselines(&mut self, bytes: &[u8]) -> Result<usize, ContainerError> {
        self.container.read_baselines(&mut BitReader::new(bytes))
    }

    pub fn receive_updates(&mut self, bytes: &[u8]) -> Result<usize, ContainerError> {
        self.container.read_updates(&mut BitReader::new(bytes))
    }
}
