pub use stackwatch_core::prelude::*;

// vim: ts=4
