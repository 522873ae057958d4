//! Identity API
//!
//! Every route runs behind `identity_gate`, so a caller always has an
//! identity by the time a handler sees it.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod handler;

mod prelude;

use crate::prelude::*;
use stackwatch_core::ResponseMeta;
use stackwatch_core::token::{IdentityClaims, token_cookie};

/// Issues a token for `identity` and returns the cookie carrying it
pub fn reissue(app: &App, identity: &IdentityClaims) -> ClResult<ResponseMeta> {
	let token = app.tokens.issue(identity)?;
	ResponseMeta::new().with_cookie(&token_cookie(&app.opts.cookie_name, &token, app.opts.dev_mode))
}

// vim: ts=4
