pub use crate::app::App;
pub use stackwatch_types::prelude::*;

// vim: ts=4
