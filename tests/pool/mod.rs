macro_rules! setup {
    ($pool:ident, $instances:expr, $pool_size:expr) => {
        let _ = env_logger::builder().try_init();
        let disk = std::sync::Arc::new(pagebox::storage::memory::Memory::new());
        let $pool =
            pagebox::buffer::parallel::ParallelBufferPool::new($instances, $pool_size, disk, None);
    };
    ($pool:ident, $disk:ident, $instances:expr, $pool_size:expr) => {
        let _ = env_logger::builder().try_init();
        let $disk = std::sync::Arc::new(pagebox::storage::memory::Memory::new());
        let $pool = pagebox::buffer::parallel::ParallelBufferPool::new(
            $instances,
            $pool_size,
            $disk.clone(),
            None,
        );
    };
}

mod concurrency;
mod scenarios;
