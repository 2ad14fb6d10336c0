//! Form state for the web interface.

mod compose;

pub use compose::{ALLOWED_EXTENSIONS, Banner, ComposeForm};
