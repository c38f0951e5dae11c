pub mod base;
pub mod memory;
pub mod mongo;
pub mod store;

pub use base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{Store, StoreTx};
