pub mod controller;
pub mod flush;
mod loop_worker;

pub use controller::OutboxWorker;
pub use flush::{flush_outbox, FlushReport};
