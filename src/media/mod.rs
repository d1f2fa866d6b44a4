mod storage;

pub use storage::{MediaStorage, MediaStorageError, StagedFile};
