pub mod pending_result;

pub use pending_result::PendingResult;
