//! Basic usage example for quicklist
//!
//! This example demonstrates the fundamental operations:
//! - Creating a list with a fill policy and compression depth
//! - Pushing and popping at both ends
//! - Indexed lookup and interior edits
//! - Inspecting which nodes are compressed

use quicklist::{Direction, FillPolicy, Options, QuickList};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Configure list options
    let options = Options::new()
        .fill(FillPolicy::Count(64)) // 64 entries per node
        .compress_depth(1); // keep one raw node at each end

    let mut list = QuickList::new(options)?;
    println!("List created with {:?}", list.options());

    // Push some entries
    println!("Pushing data...");
    for i in 0..1000 {
        list.push_tail(format!("event:{:04}", i % 50).as_bytes())?;
    }
    list.push_head(b"header")?;

    // Indexed lookup
    println!("Reading data...");
    println!("first => {}", list.index(0)?.value());
    println!("last  => {}", list.index(-1)?.value());

    // Interior edits
    let anchor = list.index(500)?;
    list.insert_after(&anchor, b"marker")?;
    list.replace_at_index(1, b"12345")?;
    let removed = list.delete_range(-10, 10)?;
    println!("Removed {} entries from the tail", removed);

    // Iterate backward over the last few entries
    for entry in list.iter(Direction::Backward).take(3) {
        println!("tail entry => {}", entry?.value());
    }

    // Node statistics
    let compressed = list.nodes().filter(|n| n.compressed).count();
    println!(
        "{} entries in {} nodes, {} compressed",
        list.len(),
        list.node_count(),
        compressed
    );

    list.check_invariants()?;
    println!("Example completed successfully!");

    Ok(())
}
