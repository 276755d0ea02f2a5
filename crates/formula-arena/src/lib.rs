//! Relocatable byte arena for Formula's shared dataset storage.
//!
//! Everything a dataset owns lives in one contiguous region that can grow.
//! Growing may move the region (a `Vec` reallocation, or a file remap), so
//! callers never hold addresses: they hold [`ArenaOffset`]s and resolve them
//! to byte slices at the point of use.
//!
//! The [`Arena`] trait encodes that discipline in the borrow checker:
//! allocation takes `&mut self`, so no slice obtained through
//! [`Arena::bytes`] / [`Arena::bytes_mut`] can outlive an allocation.
//!
//! Two implementations are provided:
//! - [`HeapArena`]: a process-local region backed by a `Vec<u8>`.
//! - [`MappedArena`]: a memory-mapped file that other processes can open.

#![deny(unsafe_code)]

mod config;
mod error;
pub mod header;
mod heap;
mod mapped;
mod offset;

pub use crate::config::{ArenaConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY};
pub use crate::error::{ArenaError, Result};
pub use crate::heap::HeapArena;
pub use crate::mapped::MappedArena;
pub use crate::offset::{Allocation, ArenaOffset};

/// Every allocation starts on, and is rounded up to, this many bytes.
pub const ALIGNMENT: usize = 8;

pub(crate) fn aligned_len(len: usize) -> usize {
    (len.max(1) + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// A growable region addressed by stable offsets.
///
/// Contract:
/// - Allocations are zeroed and never move relative to the region start.
/// - Any allocation may relocate the region; slices borrowed from it are
///   invalid afterwards (enforced by `&mut self`).
/// - Allocation failure is fatal and panics. There is no partial success.
/// - Nothing is ever freed individually; the region is reclaimed as a whole.
pub trait Arena {
    /// Allocate at least `len` bytes and report the granted capacity.
    fn allocate_size(&mut self, len: usize) -> Allocation;

    /// Resolve `len` bytes at `offset`.
    ///
    /// Panics if the range lies outside allocated space.
    fn bytes(&self, offset: ArenaOffset, len: usize) -> &[u8];

    /// Mutable counterpart of [`Arena::bytes`].
    fn bytes_mut(&mut self, offset: ArenaOffset, len: usize) -> &mut [u8];

    /// Offset of the owner's top-level structure, or null if none was set.
    fn root(&self) -> ArenaOffset;

    fn set_root(&mut self, root: ArenaOffset);

    /// Bytes handed out so far, header included.
    fn used(&self) -> usize;

    /// Bytes currently reserved by the region.
    fn capacity(&self) -> usize;

    /// Allocate at least `len` bytes.
    fn allocate(&mut self, len: usize) -> ArenaOffset {
        self.allocate_size(len).offset
    }

    fn read_u8(&self, at: ArenaOffset) -> u8 {
        self.bytes(at, 1)[0]
    }

    fn write_u8(&mut self, at: ArenaOffset, value: u8) {
        self.bytes_mut(at, 1)[0] = value;
    }

    fn read_u32(&self, at: ArenaOffset) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes(at, 4));
        u32::from_le_bytes(raw)
    }

    fn write_u32(&mut self, at: ArenaOffset, value: u32) {
        self.bytes_mut(at, 4).copy_from_slice(&value.to_le_bytes());
    }

    fn read_i32(&self, at: ArenaOffset) -> i32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes(at, 4));
        i32::from_le_bytes(raw)
    }

    fn write_i32(&mut self, at: ArenaOffset, value: i32) {
        self.bytes_mut(at, 4).copy_from_slice(&value.to_le_bytes());
    }

    fn read_u64(&self, at: ArenaOffset) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.bytes(at, 8));
        u64::from_le_bytes(raw)
    }

    fn write_u64(&mut self, at: ArenaOffset, value: u64) {
        self.bytes_mut(at, 8).copy_from_slice(&value.to_le_bytes());
    }

    fn read_f64(&self, at: ArenaOffset) -> f64 {
        f64::from_bits(self.read_u64(at))
    }

    fn write_f64(&mut self, at: ArenaOffset, value: f64) {
        self.write_u64(at, value.to_bits());
    }

    fn read_offset(&self, at: ArenaOffset) -> ArenaOffset {
        ArenaOffset::new(self.read_u64(at))
    }

    fn write_offset(&mut self, at: ArenaOffset, value: ArenaOffset) {
        self.write_u64(at, value.as_u64());
    }

    /// Copy `len` bytes from `src` to `dst`; the ranges may overlap.
    fn copy_within(&mut self, src: ArenaOffset, dst: ArenaOffset, len: usize) {
        if len == 0 || src == dst {
            return;
        }
        let start = src.min(dst);
        let end = src.max(dst).as_u64() + len as u64;
        let span = usize::try_from(end - start.as_u64()).unwrap_or(usize::MAX);
        let region = self.bytes_mut(start, span);
        let from = usize::try_from(src.as_u64() - start.as_u64()).unwrap_or(usize::MAX);
        let to = usize::try_from(dst.as_u64() - start.as_u64()).unwrap_or(usize::MAX);
        region.copy_within(from..from + len, to);
    }
}

/// Panics with the arena's standard out-of-space message.
#[cold]
pub(crate) fn exhausted(requested: usize, used: usize, max_capacity: u64) -> ! {
    panic!(
        "arena exhausted: requested {requested} bytes with {used} in use \
         (max capacity {max_capacity})"
    )
}
