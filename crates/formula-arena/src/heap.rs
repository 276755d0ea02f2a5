use crate::config::ArenaConfig;
use crate::header::{self, HEADER_SIZE};
use crate::offset::{Allocation, ArenaOffset};
use crate::{aligned_len, exhausted, Arena};

/// Process-local arena backed by a `Vec<u8>`.
///
/// The region doubles when it runs out of room, which moves it in memory.
/// That makes it a faithful stand-in for the mapped arena in tests: any code
/// that keeps an address across an allocation breaks here too.
#[derive(Debug, Clone)]
pub struct HeapArena {
    region: Vec<u8>,
    max_capacity: u64,
}

impl HeapArena {
    pub fn new(config: &ArenaConfig) -> Self {
        let initial = usize::try_from(config.effective_initial_capacity()).unwrap_or(usize::MAX);
        let mut region = vec![0u8; initial];
        header::init(&mut region, config.max_capacity);
        Self {
            region,
            max_capacity: config.max_capacity.max(HEADER_SIZE as u64),
        }
    }

    /// Snapshot of the whole region, e.g. to persist it or hand it to a reader.
    pub fn as_bytes(&self) -> &[u8] {
        &self.region
    }

    fn write_pos(&self) -> usize {
        usize::try_from(header::write_pos(&self.region)).unwrap_or(usize::MAX)
    }

    fn grow_to_fit(&mut self, needed: usize) {
        if needed <= self.region.len() {
            return;
        }

        let max = usize::try_from(self.max_capacity).unwrap_or(usize::MAX);
        if needed > max {
            exhausted(needed - self.write_pos(), self.write_pos(), self.max_capacity);
        }

        let grown = self.region.len().saturating_mul(2).max(needed).min(max);
        log::debug!(
            "heap arena growing from {} to {} bytes",
            self.region.len(),
            grown
        );
        self.region.resize(grown, 0);
    }
}

impl Default for HeapArena {
    fn default() -> Self {
        Self::new(&ArenaConfig::default())
    }
}

impl Arena for HeapArena {
    fn allocate_size(&mut self, len: usize) -> Allocation {
        let capacity = aligned_len(len);
        let start = self.write_pos();
        let end = start
            .checked_add(capacity)
            .unwrap_or_else(|| exhausted(capacity, start, self.max_capacity));

        self.grow_to_fit(end);
        self.region[start..end].fill(0);
        header::set_write_pos(&mut self.region, end as u64);

        Allocation {
            offset: ArenaOffset::new(start as u64),
            capacity,
        }
    }

    fn bytes(&self, offset: ArenaOffset, len: usize) -> &[u8] {
        let start = offset.as_index();
        assert!(
            start >= HEADER_SIZE && start.saturating_add(len) <= self.write_pos(),
            "arena range {offset}+{len} is outside allocated space"
        );
        &self.region[start..start + len]
    }

    fn bytes_mut(&mut self, offset: ArenaOffset, len: usize) -> &mut [u8] {
        let start = offset.as_index();
        assert!(
            start >= HEADER_SIZE && start.saturating_add(len) <= self.write_pos(),
            "arena range {offset}+{len} is outside allocated space"
        );
        &mut self.region[start..start + len]
    }

    fn root(&self) -> ArenaOffset {
        ArenaOffset::new(header::root(&self.region))
    }

    fn set_root(&mut self, root: ArenaOffset) {
        header::set_root(&mut self.region, root.as_u64());
    }

    fn used(&self) -> usize {
        self.write_pos()
    }

    fn capacity(&self) -> usize {
        self.region.len()
    }
}
