/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Suffix identifying logical data files inside the database directory
pub const DATA_FILE_SUFFIX: &str = ".data";

/// Invalid page ID constant
pub const INVALID_PAGE_ID: PageId = PageId(u32::MAX);

use super::types::PageId;
