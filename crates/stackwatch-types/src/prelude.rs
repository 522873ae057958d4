pub use crate::error::{ClResult, Error, FormErrors};
pub use crate::types::Timestamp;

pub use tracing::{debug, error, info, warn};

// vim: ts=4
