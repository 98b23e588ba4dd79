#![forbid(unsafe_code)]

pub mod fixtures;
pub mod memory;
pub mod repository;

pub use memory::InMemoryRepository;
pub use repository::{
    ProgressRepository, RoundDataRepository, Storage, StorageError, SubmissionRepository,
};
