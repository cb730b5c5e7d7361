use strata::common::{StorageConfig, TxId};
use strata::engine::StorageEngine;
use strata::storage::disk::BlockStore;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::try_init()?;

    println!("Strata - block storage and buffer management");
    println!("============================================\n");

    let db_dir = std::env::temp_dir().join("strata-demo");
    let config = StorageConfig::from_env(&db_dir)?;
    let engine = StorageEngine::open(config)?;
    println!(
        "Opened {} database in {}",
        if engine.is_new() { "new" } else { "existing" },
        db_dir.display()
    );

    let fm = engine.file_manager();
    let bpm = engine.buffer_pool();
    let log = engine.log_manager();
    println!("Buffer pool: {} frames, {} available\n", bpm.capacity(), bpm.available());

    // Give the demo table three fresh blocks
    let blocks = (0..3)
        .map(|_| fm.append("demo.tbl"))
        .collect::<Result<Vec<_>, _>>()?;
    println!(
        "Appended blocks {:?}; table now has {} blocks",
        blocks.iter().map(|b| b.number()).collect::<Vec<_>>(),
        fm.length_in_blocks("demo.tbl")?
    );

    // Modify every block under one transaction
    let tx = TxId::new(1);
    for (i, block) in blocks.iter().enumerate() {
        let handle = bpm.pin(block)?;
        let lsn = log.append(format!("tx 1 writes {block}").as_bytes())?;
        {
            let mut page = handle.page_mut();
            page.set_int(0, i as i32 * 100)?;
            page.set_string(4, &format!("row in {block}"))?;
        }
        handle.set_modified(tx, Some(lsn));
        println!("Wrote {} (lsn {}), pins = {}", block, lsn, handle.pin_count());
        bpm.unpin(handle);
    }

    // Commit: the log is forced before any page reaches disk
    bpm.flush_all(tx)?;
    println!("\nFlushed transaction {tx}; log durable up to lsn {}", log.last_saved_lsn());

    // Read one block back through the pool
    let handle = bpm.pin(&blocks[1])?;
    {
        let page = handle.page();
        println!(
            "Read back {}: int = {}, string = {:?}",
            handle.block(),
            page.get_int(0)?,
            page.get_string(4)?
        );
    }
    bpm.unpin(handle);

    println!("\nLog holds {} records", log.records()?.len());
    println!("Demo completed successfully!");
    Ok(())
}
