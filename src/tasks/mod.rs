pub mod backpressure;
pub mod processor;
pub mod queue;
pub mod scan;
pub mod scheduler;
