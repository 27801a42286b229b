use crate::{constants::MAX_CHANGE_HISTORY, types::Tick};

#[derive(Clone, Debug, PartialEq, Eq)]
struct ItemChange {
    tick: Tick,
    payload: Option<Vec<u8>>,
}

/// One string of a table, with its payload and change stamps.
#[derive(Clone, Debug)]
pub struct StringTableItem {
    name: String,
    payload: Option<Vec<u8>>,
    tick_created: Tick,
    tick_changed: Tick,
    dictionary_index: Option<u32>,
    change_history: Option<Vec<ItemChange>>,
}

impl StringTableItem {
    pub(crate) fn new(name: &str, tick: Tick, keep_history: bool) -> Self {
        let change_history = if keep_history {
            Some(vec![ItemChange {
                tick,
                payload: None,
            }])
        } else {
            None
        };

        Self {
            name: name.to_string(),
            payload: None,
            tick_created: tick,
            tick_changed: tick,
            dictionary_index: None,
            change_history,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn tick_created(&self) -> Tick {
        self.tick_created
    }

    pub fn tick_changed(&self) -> Tick {
        self.tick_changed
    }

    pub fn dictionary_index(&self) -> Option<u32> {
        self.dictionary_index
    }

    pub(crate) fn set_dictionary_index(&mut self, index: Option<u32>) {
        self.dictionary_index = index;
    }

    pub(crate) fn set_ticks(&mut self, tick_created: Tick, tick_changed: Tick) {
        self.tick_created = tick_created;
        self.tick_changed = tick_changed;
    }

    /// Replaces the payload and stamps `tick`. Returns false, touching
    /// nothing, when the payload is unchanged.
    pub(crate) fn set_payload(&mut self, tick: Tick, payload: Option<&[u8]>) -> bool {
        if self.payload.as_deref() == payload {
            return false;
        }

        self.payload = payload.map(<[u8]>::to_vec);
        self.tick_changed = tick;

        if let Some(history) = self.change_history.as_mut() {
            let change = ItemChange {
                tick,
                payload: self.payload.clone(),
            };
            match history.last_mut() {
                Some(last) if last.tick >= tick => *last = change,
                _ => {
                    if history.len() >= MAX_CHANGE_HISTORY {
                        history.remove(0);
                    }
                    history.push(change);
                }
            }
        }

        true
    }

    /// Rolls the payload back to its value as of `tick` and returns the
    /// resulting change tick. Items created after `tick` lose their payload.
    pub(crate) fn restore_tick(&mut self, tick: Tick) -> Tick {
        let Some(history) = self.change_history.as_ref() else {
            return self.tick_changed;
        };

        match history.iter().rev().find(|change| change.tick <= tick) {
            Some(change) => {
                self.payload = change.payload.clone();
                self.tick_changed = change.tick;
            }
            None => {
                self.payload = None;
                self.tick_changed = tick;
            }
        }

        self.tick_changed
    }
}
