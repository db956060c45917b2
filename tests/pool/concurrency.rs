use std::sync::Mutex;

use rand::Rng;

use pagebox::buffer::page::PAGE_SIZE;
use pagebox::error::{Error, Result};
use pagebox::storage::DiskManager;

#[test]
fn test_concurrent_fetch_and_unpin() -> Result<()> {
    setup!(pool, 4, 4);

    // seed twice as many pages as there are frames, so fetches both hit
    // and miss under contention
    let mut ids = Vec::new();
    for _ in 0..32 {
        let page = pool.new_page()?;
        let mut guard = page.write()?;
        let id = guard.id;
        guard.data[..8].copy_from_slice(&id.to_be_bytes());
        drop(guard);
        assert!(pool.unpin_page(id, true)?);
        ids.push(id);
    }

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let mut rng = rand::thread_rng();
                for _ in 0..200 {
                    let id = ids[rng.gen_range(0..ids.len())];
                    match pool.fetch_page(id) {
                        Ok(page) => {
                            let guard = page.read().unwrap();
                            assert_eq!(id, guard.id);
                            assert_eq!(&id.to_be_bytes()[..], &guard.data[..8]);
                            drop(guard);
                            assert!(pool.unpin_page(id, false).unwrap());
                        }
                        // every frame of the owning instance was pinned
                        Err(Error::NoAvailableFrame) => {}
                        Err(err) => panic!("fetch failed: {}", err),
                    }
                }
            });
        }
    });

    Ok(())
}

#[test]
fn test_concurrent_allocation_yields_distinct_ids() -> Result<()> {
    setup!(pool, 2, 8);

    let allocated = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    match pool.new_page() {
                        Ok(page) => {
                            let id = page.read().unwrap().id;
                            assert!(pool.unpin_page(id, false).unwrap());
                            allocated.lock().unwrap().push(id);
                        }
                        Err(Error::NoAvailableFrame) => {}
                        Err(err) => panic!("new_page failed: {}", err),
                    }
                }
            });
        }
    });

    // page ids are handed out from per-instance progressions and must
    // never repeat
    let mut ids = allocated.into_inner().unwrap();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(total, ids.len());

    Ok(())
}

#[test]
fn test_concurrent_writers_round_trip() -> Result<()> {
    setup!(pool, disk, 4, 2);

    let written = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..16 {
                    match pool.new_page() {
                        Ok(page) => {
                            let mut guard = page.write().unwrap();
                            let id = guard.id;
                            guard.data[..8].copy_from_slice(&id.to_be_bytes());
                            drop(guard);
                            assert!(pool.unpin_page(id, true).unwrap());
                            written.lock().unwrap().push(id);
                        }
                        Err(Error::NoAvailableFrame) => {}
                        Err(err) => panic!("new_page failed: {}", err),
                    }
                }
            });
        }
    });

    pool.flush_all_pages()?;
    for id in written.into_inner().unwrap() {
        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(id, &mut buf)?;
        assert_eq!(&id.to_be_bytes()[..], &buf[..8]);
    }

    Ok(())
}
