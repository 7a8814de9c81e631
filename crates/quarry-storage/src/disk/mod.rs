//! Disk manager contract and implementations.
//!
//! The buffer pool talks to the backing store only through the
//! [`DiskManager`] trait: blocking positioned reads and writes of whole
//! pages, plus page deallocation. Two implementations ship: a file-backed
//! manager for real databases and an in-memory manager for tests and
//! benchmarks.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use quarry_common::types::PageId;

/// Blocking page-granular I/O on the backing store.
///
/// `read_page` and `write_page` must be callable concurrently from multiple
/// threads and must not acquire any buffer pool lock.
pub trait DiskManager: Send + Sync {
    /// Fills `buf` with the bytes of a page. A page that was never written
    /// reads back as zeroes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> io::Result<()>;

    /// Persists `buf` as the bytes of a page.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> io::Result<()>;

    /// Releases a page on the backing store. May be a no-op; the buffer
    /// pool still calls it on every delete.
    fn deallocate_page(&self, page_id: PageId);
}

/// Disk manager backed by a single database file.
///
/// Pages live at `page_id * page_size` offsets. Positioned I/O
/// (`read_at`/`write_at`) lets multiple threads issue reads and writes
/// without a lock on the file.
pub struct FileDiskManager {
    file: File,
    path: PathBuf,
    page_size: usize,
}

impl FileDiskManager {
    /// Opens or creates a database file.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> io::Result<Self> {
        assert!(page_size > 0, "page_size must be > 0");
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            file,
            path,
            page_size,
        })
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn offset(&self, page_id: PageId) -> u64 {
        page_id.as_u64() * self.page_size as u64
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        let offset = self.offset(page_id);
        let mut read = 0;
        while read < buf.len() {
            match self.file.read_at(&mut buf[read..], offset + read as u64) {
                // EOF: the page was allocated but never written.
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf[read..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        self.file.write_all_at(buf, self.offset(page_id))
    }

    fn deallocate_page(&self, _page_id: PageId) {
        // The backing file does not reclaim page slots.
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// In-memory disk manager for tests and benchmarks.
pub struct MemoryDiskManager {
    pages: Mutex<HashMap<PageId, Vec<u8>>>,
    page_size: usize,
}

impl MemoryDiskManager {
    /// Creates an empty in-memory store.
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            page_size,
        }
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of pages ever written and not deallocated.
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        let pages = self.pages.lock();
        match pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(&data[..buf.len()]),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        self.pages.lock().insert(page_id, buf.to_vec());
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.pages.lock().remove(&page_id);
    }
}

impl std::fmt::Debug for MemoryDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDiskManager")
            .field("page_size", &self.page_size)
            .field("page_count", &self.page_count())
            .finish()
    }
}
