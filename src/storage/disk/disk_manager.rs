use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{PageId, Result, StorageError, DATA_FILE_SUFFIX, PAGE_SIZE};

/// Returns the byte offset of a page within its file.
/// Widened to u64 before the multiply so large files don't overflow.
fn page_offset(page_id: PageId) -> u64 {
    page_id.as_u32() as u64 * PAGE_SIZE as u64
}

/// Name-to-handle and name-to-counter maps behind one lock, so a handle and
/// its counter are always created in the same critical section: no handle
/// without a counter, no counter without a handle.
#[derive(Default)]
struct FileRegistry {
    /// Open handle per logical file name (e.g. "users_table.data")
    handles: HashMap<String, Arc<File>>,
    /// Next available page id per logical file name
    next_page_ids: HashMap<String, Arc<AtomicU32>>,
}

/// DiskManager is responsible for all physical I/O of a multi-file database.
/// Each logical database object (a table or an index) maps to its own file
/// inside the base directory, and a (file name, page id) pair addresses one
/// fixed-size page within that file.
///
/// All I/O is positional and synchronous: reads and writes never contend
/// with each other, and a successful `write_page` is durable before it
/// returns. Caching and write scheduling belong to the buffer pool above
/// this layer.
pub struct DiskManager {
    /// Base directory where all database files reside
    db_path: PathBuf,
    /// Shared file state; lookups take the read lock, first-time creation
    /// takes the write lock
    registry: RwLock<FileRegistry>,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens a disk manager over the given base directory, creating the
    /// directory if it doesn't exist and registering every data file
    /// already present in it.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if !db_path.exists() {
            fs::create_dir_all(&db_path).map_err(|source| StorageError::CreateDirectory {
                path: db_path.clone(),
                source,
            })?;
        }

        let manager = Self {
            db_path,
            registry: RwLock::new(FileRegistry::default()),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        };
        manager.bootstrap()?;
        Ok(manager)
    }

    /// Scans the base directory for existing data files and seeds each
    /// file's next-page-id counter from its size on disk. Entries without
    /// the data-file suffix are ignored. Any scan or open failure aborts
    /// construction.
    fn bootstrap(&self) -> Result<()> {
        let mut registry = self.registry.write();

        for entry in fs::read_dir(&self.db_path)? {
            let entry = entry?;
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !file_name.ends_with(DATA_FILE_SUFFIX) || !entry.file_type()?.is_file() {
                continue;
            }

            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(entry.path())?;
            let next_page_id = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

            registry.handles.insert(file_name.clone(), Arc::new(file));
            registry
                .next_page_ids
                .insert(file_name, Arc::new(AtomicU32::new(next_page_id)));
        }
        Ok(())
    }

    /// Returns the open handle for a logical file, creating and registering
    /// the file (with a fresh counter at 0) on first access. Across any
    /// number of concurrent first-time accesses, exactly one handle is
    /// created per name.
    fn resolve(&self, file_name: &str) -> Result<Arc<File>> {
        if let Some(handle) = self.registry.read().handles.get(file_name) {
            return Ok(Arc::clone(handle));
        }

        let mut registry = self.registry.write();
        // Re-check under the exclusive lock: another caller may have won the race
        if let Some(handle) = registry.handles.get(file_name) {
            return Ok(Arc::clone(handle));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.db_path.join(file_name))?;
        let handle = Arc::new(file);

        registry
            .handles
            .insert(file_name.to_string(), Arc::clone(&handle));
        registry
            .next_page_ids
            .insert(file_name.to_string(), Arc::new(AtomicU32::new(0)));
        Ok(handle)
    }

    /// Reads a page from the given file into the provided buffer.
    /// The buffer must be exactly PAGE_SIZE bytes.
    ///
    /// Reading past end-of-file is not an error: any bytes the file doesn't
    /// cover come back as zeros, so an allocated-but-never-written page reads
    /// as an all-zero page.
    pub fn read_page(&self, file_name: &str, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let handle = self.resolve(file_name)?;
        let offset = page_offset(page_id);

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = handle.read_at(&mut data[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        // Short read means the page lies partly or wholly past end-of-file
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to the given file from the provided buffer.
    /// The buffer must be exactly PAGE_SIZE bytes.
    ///
    /// The write is forced to persistent storage (data and file metadata)
    /// before this returns: a successful call survives a process restart.
    pub fn write_page(&self, file_name: &str, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let handle = self.resolve(file_name)?;
        let offset = page_offset(page_id);

        handle.write_all_at(data, offset)?;
        handle.sync_all()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Allocates the next page id in the given file, creating the file on
    /// first access. Ids are dense, zero-based, and never reused; no bytes
    /// are written, so a freshly allocated page reads back as all zeros.
    pub fn allocate_page(&self, file_name: &str) -> Result<PageId> {
        self.resolve(file_name)?;

        let counter = self
            .registry
            .read()
            .next_page_ids
            .get(file_name)
            .map(Arc::clone)
            // Unreachable if resolve() upheld its contract; surfaced rather
            // than fabricating a counter
            .ok_or_else(|| StorageError::UntrackedFile(file_name.to_string()))?;

        Ok(PageId::new(counter.fetch_add(1, Ordering::SeqCst)))
    }

    /// Forces one file's data and metadata to persistent storage.
    pub fn sync(&self, file_name: &str) -> Result<()> {
        let handle = self.resolve(file_name)?;
        handle.sync_all()?;
        Ok(())
    }

    /// Closes every registered handle and clears all in-memory state.
    ///
    /// Every handle is flushed and closed even if an earlier one fails; the
    /// first failure is reported after the loop completes. Not safe to call
    /// concurrently with in-flight read/write/allocate calls - callers must
    /// quiesce the manager first.
    pub fn shut_down(&self) -> Result<()> {
        let mut registry = self.registry.write();
        let handles = std::mem::take(&mut registry.handles);
        registry.next_page_ids.clear();
        drop(registry);

        let mut failed = 0;
        let mut first_error = None;
        for handle in handles.into_values() {
            if let Err(e) = handle.sync_all() {
                failed += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(source) => Err(StorageError::ShutdownIncomplete { failed, source }),
            None => Ok(()),
        }
    }

    /// Returns the number of logical files currently registered.
    pub fn get_num_files(&self) -> usize {
        self.registry.read().handles.len()
    }

    /// Returns the number of disk reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of disk writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the base directory holding the database files.
    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        // Ensure all data is flushed to disk
        let registry = self.registry.get_mut();
        for handle in registry.handles.values() {
            let _ = handle.sync_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(PageId::new(0)), 0);
        assert_eq!(page_offset(PageId::new(1)), PAGE_SIZE as u64);
        assert_eq!(page_offset(PageId::new(7)), 7 * PAGE_SIZE as u64);
        // No overflow near the top of the id space
        assert_eq!(
            page_offset(PageId::new(u32::MAX)),
            u32::MAX as u64 * PAGE_SIZE as u64
        );
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("db");
        let dm = DiskManager::open(&db_path).unwrap();

        assert!(db_path.is_dir());
        assert_eq!(dm.get_num_files(), 0);
        assert_eq!(dm.get_db_path(), db_path);
    }

    #[test]
    fn test_read_unwritten_page_is_zeroed() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::open(dir.path()).unwrap();

        let mut data = [0xAAu8; PAGE_SIZE];
        dm.read_page("empty.data", PageId::new(12), &mut data)
            .unwrap();

        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_trailing_page_is_zero_padded() {
        let dir = tempdir().unwrap();
        // A file that is not a whole multiple of PAGE_SIZE
        fs::write(dir.path().join("ragged.data"), vec![0xFFu8; PAGE_SIZE + 10]).unwrap();

        let dm = DiskManager::open(dir.path()).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page("ragged.data", PageId::new(1), &mut data)
            .unwrap();

        assert!(data[..10].iter().all(|&b| b == 0xFF));
        assert!(data[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bootstrap_ignores_non_data_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("table.data"), vec![0u8; PAGE_SIZE]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"not a data file").unwrap();
        fs::create_dir(dir.path().join("sub.data")).unwrap();

        let dm = DiskManager::open(dir.path()).unwrap();
        assert_eq!(dm.get_num_files(), 1);
    }

    #[test]
    #[should_panic(expected = "Buffer must be PAGE_SIZE bytes")]
    fn test_read_rejects_wrong_buffer_size() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::open(dir.path()).unwrap();
        let mut data = [0u8; PAGE_SIZE - 1];
        let _ = dm.read_page("t.data", PageId::new(0), &mut data);
    }

    #[test]
    #[should_panic(expected = "Buffer must be PAGE_SIZE bytes")]
    fn test_write_rejects_wrong_buffer_size() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::open(dir.path()).unwrap();
        let data = [0u8; PAGE_SIZE + 1];
        let _ = dm.write_page("t.data", PageId::new(0), &data);
    }

    #[test]
    fn test_io_stats() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::open(dir.path()).unwrap();

        assert_eq!(dm.get_num_reads(), 0);
        assert_eq!(dm.get_num_writes(), 0);

        let data = [0u8; PAGE_SIZE];
        dm.write_page("t.data", PageId::new(0), &data).unwrap();
        assert_eq!(dm.get_num_writes(), 1);

        let mut buf = [0u8; PAGE_SIZE];
        dm.read_page("t.data", PageId::new(0), &mut buf).unwrap();
        assert_eq!(dm.get_num_reads(), 1);

        // Allocation is bookkeeping only, not an I/O
        dm.allocate_page("t.data").unwrap();
        assert_eq!(dm.get_num_reads(), 1);
        assert_eq!(dm.get_num_writes(), 1);
    }
}
