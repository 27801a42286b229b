pub type Tick = i32;
pub type TableId = u8;

/// Last-acknowledged tick of a consumer that has acknowledged nothing. Writing
/// an update against it produces a baseline.
pub const BASELINE_TICK: Tick = -1;

/// Which side of the replication link a container or insert belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableRole {
    Producer,
    Consumer,
}
