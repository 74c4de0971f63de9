pub mod comments;
pub mod discussions;
pub mod persist;
pub mod profile;
pub mod records;

pub use comments::CommentStore;
pub use discussions::DiscussionStore;
pub use persist::{MemoryStateStore, PersistError, StateStore};
pub use profile::ProfileStore;
pub use records::RecordSet;
