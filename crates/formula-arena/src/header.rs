//! Fixed header at the start of every arena region.
//!
//! ```text
//! 0   magic        u64  "FMLARENA"
//! 8   version      u32
//! 12  (reserved)   u32
//! 16  write_pos    u64  first unallocated byte
//! 24  root         u64  offset of the owner's top-level structure
//! 32  max_capacity u64
//! 40  (reserved)   24 bytes
//! ```
//!
//! All fields are little-endian. The header lives in the region itself so a
//! second process mapping the same file sees the allocator state.

use crate::error::{ArenaError, Result};

pub const ARENA_MAGIC: u64 = 0x414e_4552_414c_4d46; // "FMLARENA" read little-endian

pub const ARENA_VERSION: u32 = 1;

pub const HEADER_SIZE: usize = 64;

const MAGIC: usize = 0;
const VERSION: usize = 8;
const WRITE_POS: usize = 16;
const ROOT: usize = 24;
const MAX_CAPACITY: usize = 32;

fn get_u64(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(raw)
}

fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

/// Write a fresh header into the first `HEADER_SIZE` bytes of `region`.
pub fn init(region: &mut [u8], max_capacity: u64) {
    region[..HEADER_SIZE].fill(0);
    put_u64(region, MAGIC, ARENA_MAGIC);
    region[VERSION..VERSION + 4].copy_from_slice(&ARENA_VERSION.to_le_bytes());
    put_u64(region, WRITE_POS, HEADER_SIZE as u64);
    put_u64(region, MAX_CAPACITY, max_capacity);
}

/// Check that `region` starts with a header this build understands.
pub fn validate(region: &[u8]) -> Result<()> {
    if region.len() < HEADER_SIZE {
        return Err(ArenaError::CorruptHeader(format!(
            "region is {} bytes, smaller than the {HEADER_SIZE}-byte header",
            region.len()
        )));
    }

    let magic = get_u64(region, MAGIC);
    if magic != ARENA_MAGIC {
        return Err(ArenaError::BadMagic { found: magic });
    }

    let version = get_u32(region, VERSION);
    if version != ARENA_VERSION {
        return Err(ArenaError::UnsupportedVersion {
            found: version,
            expected: ARENA_VERSION,
        });
    }

    let pos = write_pos(region);
    if pos < HEADER_SIZE as u64 || pos > region.len() as u64 {
        return Err(ArenaError::CorruptHeader(format!(
            "write position {pos} outside region of {} bytes",
            region.len()
        )));
    }

    Ok(())
}

pub fn write_pos(region: &[u8]) -> u64 {
    get_u64(region, WRITE_POS)
}

pub fn set_write_pos(region: &mut [u8], pos: u64) {
    put_u64(region, WRITE_POS, pos);
}

pub fn root(region: &[u8]) -> u64 {
    get_u64(region, ROOT)
}

pub fn set_root(region: &mut [u8], root: u64) {
    put_u64(region, ROOT, root);
}

pub fn max_capacity(region: &[u8]) -> u64 {
    get_u64(region, MAX_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_header_validates() {
        let mut region = vec![0u8; 128];
        init(&mut region, 4096);
        validate(&region).unwrap();
        assert_eq!(write_pos(&region), HEADER_SIZE as u64);
        assert_eq!(root(&region), 0);
        assert_eq!(max_capacity(&region), 4096);
    }

    #[test]
    fn rejects_foreign_bytes() {
        let region = vec![0xAB; 128];
        assert!(matches!(validate(&region), Err(ArenaError::BadMagic { .. })));
    }

    #[test]
    fn rejects_write_position_past_end() {
        let mut region = vec![0u8; 128];
        init(&mut region, 4096);
        set_write_pos(&mut region, 1024);
        assert!(matches!(validate(&region), Err(ArenaError::CorruptHeader(_))));
    }
}
