//! Servant login service: OAuth 2.0 code exchange, identity fetch, sealed access tokens, and a
//! thin typed client for the Servant REST API.
//!
//! The crate is organized the same way the login flow runs:
//!
//! - [`flows::LoginInitiator`] builds the authorize URL and hands the launch to the host.
//! - [`flows::LoginService`] exchanges the returned code through a [`oauth::TokenExchanger`],
//!   fetches the identity through an [`api::IdentityFetcher`], and seals the access token.
//! - [`flows::LoginServiceRegistry`] mirrors the host framework's login-service contract.
//! - [`api::ServantApi`] covers the remaining REST surface (archetypes, Servant Pay).

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
