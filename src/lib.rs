//! Authenticated, resilient request core for organization device-management APIs.
//!
//! Long-lived ES256 private keys are turned into short-lived bearer tokens through an OAuth 2.0
//! client-assertion exchange ([`auth::TokenIssuer`]), resource calls retry transient failures with
//! jittered exponential backoff ([`api::RequestExecutor`]), and list endpoints are drained through
//! opaque cursors ([`api::Paginator`]). [`session::Session`] wires the pieces together for a single
//! command invocation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod clock;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod retry;
pub mod session;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
