//! Integration tests for the file manager

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use strata::common::{BlockId, StrataError, BLOCK_SIZE};
use strata::storage::disk::{BlockStore, FileManager};
use strata::storage::page::Page;
use tempfile::TempDir;

fn create_fm() -> (FileManager, TempDir) {
    let dir = TempDir::new().unwrap();
    let fm = FileManager::new(dir.path(), BLOCK_SIZE).unwrap();
    (fm, dir)
}

#[test]
fn test_file_manager_append_three_blocks() {
    let (fm, _dir) = create_fm();

    let blocks: Vec<_> = (0..3).map(|_| fm.append("x").unwrap()).collect();
    let numbers: Vec<_> = blocks.iter().map(|b| b.number()).collect();
    assert_eq!(numbers, vec![0, 1, 2]);
    assert_eq!(fm.length_in_blocks("x").unwrap(), 3);
}

#[test]
fn test_file_manager_append_returns_current_length() {
    let (fm, _dir) = create_fm();

    for expected in 0..10 {
        assert_eq!(fm.length_in_blocks("students.tbl").unwrap(), expected);
        let block = fm.append("students.tbl").unwrap();
        assert_eq!(block, BlockId::new("students.tbl", expected));
        assert_eq!(fm.length_in_blocks("students.tbl").unwrap(), expected + 1);
    }
}

#[test]
fn test_file_manager_appended_block_is_zeroed() {
    let (fm, _dir) = create_fm();
    let block = fm.append("t").unwrap();

    let mut page = Page::new(BLOCK_SIZE);
    page.contents_mut().fill(0xAB);
    fm.read(&block, &mut page).unwrap();
    assert!(page.contents().iter().all(|&b| b == 0));
}

#[test]
fn test_file_manager_random_access() {
    let (fm, _dir) = create_fm();
    let blocks: Vec<_> = (0..10).map(|_| fm.append("t").unwrap()).collect();

    let write_order = [5, 2, 8, 0, 7, 3, 9, 1, 6, 4];
    for &i in &write_order {
        let mut page = Page::new(BLOCK_SIZE);
        page.set_int(0, i as i32).unwrap();
        page.set_string(4, &format!("block {i}")).unwrap();
        fm.write(&blocks[i], &page).unwrap();
    }

    for (i, block) in blocks.iter().enumerate() {
        let mut page = Page::new(BLOCK_SIZE);
        fm.read(block, &mut page).unwrap();
        assert_eq!(page.get_int(0).unwrap(), i as i32);
        assert_eq!(page.get_string(4).unwrap(), format!("block {i}"));
    }
}

#[test]
fn test_file_manager_persistence() {
    let dir = TempDir::new().unwrap();

    {
        let fm = FileManager::new(dir.path(), BLOCK_SIZE).unwrap();
        let block = fm.append("t").unwrap();
        let mut page = Page::new(BLOCK_SIZE);
        page.set_string(0, "Persistence test").unwrap();
        fm.write(&block, &page).unwrap();
    }

    let fm = FileManager::new(dir.path(), BLOCK_SIZE).unwrap();
    assert!(!fm.is_new_database());
    assert_eq!(fm.length_in_blocks("t").unwrap(), 1);

    let mut page = Page::new(BLOCK_SIZE);
    fm.read(&BlockId::new("t", 0), &mut page).unwrap();
    assert_eq!(page.get_string(0).unwrap(), "Persistence test");
}

#[test]
fn test_file_manager_purges_temp_files_on_startup() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("temp1"), [1u8; 16]).unwrap();
    fs::write(dir.path().join("tempscratch.tbl"), [2u8; 16]).unwrap();
    fs::write(dir.path().join("students.tbl"), [3u8; 16]).unwrap();
    fs::write(dir.path().join("mytemp"), [4u8; 16]).unwrap();

    let fm = FileManager::new(dir.path(), BLOCK_SIZE).unwrap();
    assert!(!fm.is_new_database());

    let remaining: HashSet<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let expected: HashSet<_> = ["students.tbl", "mytemp"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(remaining, expected);
}

#[test]
fn test_file_manager_temp_files_are_ordinary_after_startup() {
    let (fm, _dir) = create_fm();

    let block = fm.append("temp7").unwrap();
    assert_eq!(block.number(), 0);
    assert_eq!(fm.length_in_blocks("temp7").unwrap(), 1);
}

#[test]
fn test_file_manager_plain_file_as_dir_fails_startup() {
    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("not-a-dir");
    fs::write(&file_path, b"x").unwrap();

    // The directory cannot be created over an existing file.
    let result = FileManager::new(&file_path, BLOCK_SIZE);
    assert!(matches!(result, Err(StrataError::Storage { .. })));
}

#[test]
fn test_file_manager_concurrent_appends_are_dense() {
    let (fm, _dir) = create_fm();
    let fm = Arc::new(fm);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fm = Arc::clone(&fm);
            thread::spawn(move || {
                (0..25)
                    .map(|_| fm.append("shared").unwrap().number())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut numbers: Vec<u32> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (0..100).collect::<Vec<_>>());
    assert_eq!(fm.length_in_blocks("shared").unwrap(), 100);
}

#[test]
fn test_file_manager_concurrent_files() {
    let (fm, _dir) = create_fm();
    let fm = Arc::new(fm);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let fm = Arc::clone(&fm);
            thread::spawn(move || {
                let file = format!("file{t}");
                for i in 0..10 {
                    let block = fm.append(&file).unwrap();
                    let mut page = Page::new(BLOCK_SIZE);
                    page.set_int(0, t * 100 + i).unwrap();
                    fm.write(&block, &page).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        let file = format!("file{t}");
        assert_eq!(fm.length_in_blocks(&file).unwrap(), 10);
        for i in 0..10 {
            let mut page = Page::new(BLOCK_SIZE);
            fm.read(&BlockId::new(file.as_str(), i as u32), &mut page).unwrap();
            assert_eq!(page.get_int(0).unwrap(), t * 100 + i);
        }
    }
}
