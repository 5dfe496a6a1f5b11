pub mod summary;
pub mod work_entry;
