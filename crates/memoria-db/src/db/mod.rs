//! Repository implementations, one per domain entity.

pub mod medium;
pub mod storage_target;

pub use medium::MediumRepository;
pub use storage_target::StorageTargetRepository;
