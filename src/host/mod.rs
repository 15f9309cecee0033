pub mod codec;
pub mod handler;
pub mod protocol;
pub mod types;

pub use handler::{spawn_writer, HostService};
pub use types::AppState;
