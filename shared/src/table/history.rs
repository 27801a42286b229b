use crate::constants::{MAX_HISTORY_CAPACITY, MAX_SHARED_PREFIX};

/// Largest char boundary of `string` that is not past `max` bytes.
fn floor_char_boundary(string: &str, max: usize) -> usize {
    if max >= string.len() {
        return string.len();
    }
    let mut end = max;
    while !string.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Ring of the strings most recently written (or read) during one update,
/// used for shared-prefix back-references.
///
/// Slot numbers are positions from the oldest entry, so the writer and the
/// reader must push the same strings with the same capacity.
pub struct StringHistory {
    entries: Vec<String>,
    capacity: usize,
    min_match: usize,
}

impl StringHistory {
    pub fn new(capacity: usize, min_match: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY_CAPACITY);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            min_match: min_match.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, slot: u8) -> Option<&str> {
        self.entries.get(slot as usize).map(String::as_str)
    }

    /// Records `string`, keeping at most `MAX_SHARED_PREFIX` bytes of it and
    /// evicting the oldest entry when full.
    pub fn push(&mut self, string: &str) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        let end = floor_char_boundary(string, MAX_SHARED_PREFIX);
        self.entries.push(string[..end].to_string());
    }

    /// Slot and shared-prefix length of the entry sharing the longest leading
    /// run with `string`. The first of equally good entries wins.
    pub fn best_match(&self, string: &str) -> Option<(u8, usize)> {
        let mut best: Option<(u8, usize)> = None;

        for (slot, previous) in self.entries.iter().enumerate() {
            let shared = shared_prefix_len(previous, string);
            if shared < self.min_match {
                continue;
            }
            if best.map_or(true, |(_, best_len)| shared > best_len) {
                best = Some((slot as u8, shared));
            }
        }

        best
    }
}

/// Bytes `a` and `b` share at their start, backed off to a char boundary.
pub(crate) fn shared_prefix_len(a: &str, b: &str) -> usize {
    let shared = a
        .bytes()
        .zip(b.bytes())
        .take(MAX_SHARED_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();
    floor_char_boundary(b, shared)
}
