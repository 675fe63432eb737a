pub mod file_item;
pub mod loader;
pub mod tag_item;
pub mod working_set;

pub use file_item::{FileItem, FileSummary};
pub use tag_item::TagItem;
pub use working_set::{FileId, WorkingSet};
