pub mod network;
pub mod options;
pub mod posts;
pub mod users;

pub use network::{BlogGuard, Network};
pub use posts::PostRecord;
