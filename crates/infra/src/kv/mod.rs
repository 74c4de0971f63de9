pub mod file;

pub use file::FileStateStore;
