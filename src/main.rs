use pagyr::common::PAGE_SIZE;
use pagyr::storage::disk::DiskManager;

fn main() {
    println!("Pagyr - a page-addressed multi-file storage layer");
    println!("==================================================\n");

    let db_path = "demo_db";

    let dm = DiskManager::open(db_path).expect("Failed to open disk manager");
    println!("Opened database directory: {}", db_path);
    println!("Existing data files: {}\n", dm.get_num_files());

    // Allocate a couple of pages in a table file
    let table = "users_table.data";
    let page0 = dm.allocate_page(table).expect("Failed to allocate page");
    let page1 = dm.allocate_page(table).expect("Failed to allocate page");
    println!("Allocated {} and {} in {}", page0, page1, table);

    // Write a recognizable pattern to the first page
    let mut data = [0u8; PAGE_SIZE];
    let message = b"Hello from pagyr!";
    data[..message.len()].copy_from_slice(message);
    dm.write_page(table, page0, &data)
        .expect("Failed to write page");
    println!("Wrote {} bytes durably to {}", PAGE_SIZE, page0);

    // Read it back
    let mut buf = [0u8; PAGE_SIZE];
    dm.read_page(table, page0, &mut buf)
        .expect("Failed to read page");
    println!(
        "Read back: {:?}",
        String::from_utf8_lossy(&buf[..message.len()])
    );

    // An allocated but never written page reads as zeros
    dm.read_page(table, page1, &mut buf)
        .expect("Failed to read page");
    println!(
        "Unwritten {} is all zeros: {}",
        page1,
        buf.iter().all(|&b| b == 0)
    );

    println!(
        "\nI/O stats: {} reads, {} writes",
        dm.get_num_reads(),
        dm.get_num_writes()
    );

    dm.shut_down().expect("Failed to shut down");
    println!("Shut down cleanly");

    // Clean up
    std::fs::remove_dir_all(db_path).ok();
    println!("\nDemo completed successfully!");
}
