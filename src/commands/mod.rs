pub mod import;
pub mod posts;
