pub mod logging;
pub mod text;

pub use logging::init_tracing;
pub use text::{is_blank, join_lines};
