//! Song catalog, singer registry and the disk-facing helpers around them.

pub mod singers;
pub mod store;
pub mod sync;
pub mod upload;

pub use singers::{JsonSingerRegistry, NewSinger, SharedSingerRegistry, Singer, SingerRegistry};
pub use store::LibraryStore;
pub use sync::{reconcile, SyncReport};
pub use upload::{save_upload, Upload};
