pub mod aggregate;
pub mod worker_pool;

pub use aggregate::count_and_list;
pub use worker_pool::WorkerPool;
