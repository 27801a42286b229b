use std::fmt;

use crate::TableRole;

/// Address of a string within a table.
///
/// Producer indices are what goes over the wire. Consumer indices address the
/// consumer-local namespace and are never networked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StringIndex {
    Producer(u32),
    Consumer(u32),
}

impl StringIndex {
    pub fn new(role: TableRole, value: u32) -> Self {
        match role {
            TableRole::Producer => StringIndex::Producer(value),
            TableRole::Consumer => StringIndex::Consumer(value),
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            StringIndex::Producer(value) | StringIndex::Consumer(value) => *value,
        }
    }

    pub fn role(&self) -> TableRole {
        match self {
            StringIndex::Producer(_) => TableRole::Producer,
            StringIndex::Consumer(_) => TableRole::Consumer,
        }
    }
}

impl fmt::Display for StringIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringIndex::Producer(value) => write!(f, "{value}"),
            StringIndex::Consumer(value) => write!(f, "consumer:{value}"),
        }
    }
}
