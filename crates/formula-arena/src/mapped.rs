use crate::config::ArenaConfig;
use crate::error::{io_error, ArenaError, Result};
use crate::header::{self, HEADER_SIZE};
use crate::offset::{Allocation, ArenaOffset};
use crate::{aligned_len, exhausted, Arena};
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Arena backed by a shared memory-mapped file.
///
/// Growing extends the file and remaps it, so the region can land at a new
/// address. Other processes open the same path with [`MappedArena::open`] and
/// pick up growth made by a writer through [`MappedArena::refresh`].
pub struct MappedArena {
    mmap: MmapMut,
    file: File,
    path: PathBuf,
    max_capacity: u64,
}

#[allow(unsafe_code)]
fn map(file: &File, len: usize) -> std::io::Result<MmapMut> {
    // SAFETY: the mapping is only reachable through `MappedArena`, whose
    // borrow rules drop every outstanding slice before a remap. Writers in
    // other processes are serialised by the dataset layer.
    unsafe { MmapOptions::new().len(len).map_mut(file) }
}

impl MappedArena {
    /// Create (or truncate) the arena file at `path`.
    pub fn create(path: impl AsRef<Path>, config: &ArenaConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if config.max_capacity < HEADER_SIZE as u64 {
            return Err(ArenaError::CapacityTooSmall {
                requested: config.max_capacity,
                minimum: HEADER_SIZE as u64,
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(io_error(&path))?;

        let initial = config.effective_initial_capacity();
        file.set_len(initial).map_err(io_error(&path))?;

        let len = usize::try_from(initial).unwrap_or(usize::MAX);
        let mut mmap = map(&file, len).map_err(io_error(&path))?;
        header::init(&mut mmap, config.max_capacity);
        mmap.flush().map_err(io_error(&path))?;

        log::debug!("created mapped arena {} ({initial} bytes)", path.display());

        Ok(Self {
            mmap,
            file,
            path,
            max_capacity: config.max_capacity,
        })
    }

    /// Open an arena file previously written by [`MappedArena::create`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_error(&path))?;

        let len = file.metadata().map_err(io_error(&path))?.len();
        if len < HEADER_SIZE as u64 {
            return Err(ArenaError::CorruptHeader(format!(
                "file is {len} bytes, smaller than the {HEADER_SIZE}-byte header"
            )));
        }

        let mmap = map(&file, usize::try_from(len).unwrap_or(usize::MAX))
            .map_err(io_error(&path))?;
        header::validate(&mmap)?;
        let max_capacity = header::max_capacity(&mmap).max(len);

        Ok(Self {
            mmap,
            file,
            path,
            max_capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write dirty pages back to the file.
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush().map_err(io_error(&self.path))
    }

    /// Remap if another process has grown the file since it was mapped here.
    ///
    /// Returns whether a remap happened.
    pub fn refresh(&mut self) -> Result<bool> {
        let len = self.file.metadata().map_err(io_error(&self.path))?.len();
        if len == self.mmap.len() as u64 {
            return Ok(false);
        }
        self.mmap = map(&self.file, usize::try_from(len).unwrap_or(usize::MAX))
            .map_err(io_error(&self.path))?;
        header::validate(&self.mmap)?;
        Ok(true)
    }

    fn write_pos(&self) -> usize {
        usize::try_from(header::write_pos(&self.mmap)).unwrap_or(usize::MAX)
    }

    fn grow_to_fit(&mut self, needed: usize) {
        if needed <= self.mmap.len() {
            return;
        }

        let max = usize::try_from(self.max_capacity).unwrap_or(usize::MAX);
        if needed > max {
            exhausted(needed - self.write_pos(), self.write_pos(), self.max_capacity);
        }

        let grown = self.mmap.len().saturating_mul(2).max(needed).min(max);
        log::debug!(
            "remapping arena {} from {} to {} bytes",
            self.path.display(),
            self.mmap.len(),
            grown
        );

        let remapped = self
            .file
            .set_len(grown as u64)
            .and_then(|()| map(&self.file, grown));
        match remapped {
            Ok(mmap) => self.mmap = mmap,
            Err(err) => panic!(
                "arena {} could not grow to {grown} bytes: {err}",
                self.path.display()
            ),
        }
    }
}

impl Arena for MappedArena {
    fn allocate_size(&mut self, len: usize) -> Allocation {
        let capacity = aligned_len(len);
        let start = self.write_pos();
        let end = start
            .checked_add(capacity)
            .unwrap_or_else(|| exhausted(capacity, start, self.max_capacity));

        self.grow_to_fit(end);
        self.mmap[start..end].fill(0);
        header::set_write_pos(&mut self.mmap, end as u64);

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
        &self.mmap[start..start + len]
    }

    fn bytes_mut(&mut self, offset: ArenaOffset, len: usize) -> &mut [u8] {
        let start = offset.as_index();
        assert!(
            start >= HEADER_SIZE && start.saturating_add(len) <= self.write_pos(),
            "arena range {offset}+{len} is outside allocated space"
        );
        &mut self.mmap[start..start + len]
    }

    fn root(&self) -> ArenaOffset {
        ArenaOffset::new(header::root(&self.mmap))
    }

    fn set_root(&mut self, root: ArenaOffset) {
        header::set_root(&mut self.mmap, root.as_u64());
    }

    fn used(&self) -> usize {
        self.write_pos()
    }

    fn capacity(&self) -> usize {
        self.mmap.len()
    }
}

impl Drop for MappedArena {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::warn!("failed to flush arena {} on drop: {err}", self.path.display());
        }
    }
}

impl std::fmt::Debug for MappedArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedArena")
            .field("path", &self.path)
            .field("capacity", &self.mmap.len())
            .field("used", &self.write_pos())
            .finish()
    }
}
