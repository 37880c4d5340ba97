//! Snowflake ID Generator
//!
//! Time-sortable 64-bit ids for every persisted entity.
//!
//! ```text
//! 63                         22          17          12          0
//! +---------------------------+-----------+-----------+-----------+
//! | ms since epoch (41 bits)  | machine   | node      | sequence  |
//! +---------------------------+-----------+-----------+-----------+
//! ```

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default epoch (2024-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1704067200000;

const SEQUENCE_MASK: u64 = 0xFFF;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    epoch: u64,
    machine_id: u64,
    node_id: u64,
    state: Mutex<GeneratorState>,
}

#[derive(Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator using the default epoch
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self::with_epoch(DEFAULT_EPOCH, machine_id, node_id)
    }

    /// Create a generator with a custom epoch in milliseconds
    pub fn with_epoch(epoch: u64, machine_id: u64, node_id: u64) -> Self {
        Self {
            epoch,
            machine_id: machine_id & 0x1F, // 5 bits
            node_id: node_id & 0x1F,       // 5 bits
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut timestamp = current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond; borrow the next one.
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp.saturating_sub(self.epoch)) << 22)
            | (self.machine_id << 17)
            | (self.node_id << 12)
            | state.sequence;

        id as i64
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Parse an id received as a path or body string.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique() {
        let gen = SnowflakeGenerator::new(1, 1);
        let ids: HashSet<i64> = (0..10_000).map(|_| gen.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_generate_is_monotonic() {
        let gen = SnowflakeGenerator::new(3, 0);
        let mut previous = gen.generate();
        for _ in 0..5_000 {
            let next = gen.generate();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("123"), Some(123));
        assert_eq!(parse_id(" 42 "), Some(42));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-5"), None);
        assert_eq!(parse_id("abc"), None);
    }
}
