pub mod diagnostics;
pub mod directories;
pub mod logging;
pub mod shutdown;
