pub mod storage;
pub mod util;

pub use storage::{
    Record, Storage, StorageError, StorageIterator, StorageRead, StorageResult, WriteOptions,
};
pub use storage::config::StorageConfig;
pub use util::BytesRange;
