use std::sync::{Arc, RwLock};

use crate::types::{TableRole, Tick};

use super::{error::StringTableError, index::StringIndex, string_table::StringTable};

/// Secondary table kept behind a primary one, shared with whoever consumes it
/// on its own cadence.
pub type MirrorTable = Arc<RwLock<StringTable>>;

pub fn new_mirror_table(table: StringTable) -> MirrorTable {
    Arc::new(RwLock::new(table))
}

/// Copies every producer string of `primary` changed after `tick_ack` into
/// `mirror`. Mirrors only grow by appending at their next free index.
pub(crate) fn push_into_mirror(
    primary: &StringTable,
    mirror: &mut StringTable,
    tick_ack: Tick,
) -> Result<(), StringTableError> {
    mirror.set_tick(primary.tick());

    for (index, item) in primary.items().iter() {
        if item.tick_changed() <= tick_ack {
            continue;
        }

        let payload = item.payload().unwrap_or(&[]);
        let mirror_count = mirror.num_strings();

        if (index as usize) < mirror_count {
            mirror.set_payload(StringIndex::Producer(index), Some(payload))?;
            continue;
        }

        if index as usize == mirror_count {
            let added = mirror.insert(TableRole::Producer, item.name(), Some(payload))?;
            if added == StringIndex::Producer(index) {
                continue;
            }
        }

        return Err(StringTableError::MirrorOutOfOrder {
            table: primary.name().to_string(),
            mirror: mirror.name().to_string(),
            index,
            mirror_count,
        });
    }

    Ok(())
}
