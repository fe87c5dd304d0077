//! Servant endpoint metadata.
//!
//! [`ServantEndpoints`] names the three hosts the crate talks to: the browser-facing authorize
//! endpoint, the token endpoint used for code and refresh grants, and the REST API base. Endpoints
//! must use HTTPS; plain HTTP is accepted only for loopback hosts so local development servers
//! (`api0.localhost:4000`) and mock servers keep working.

pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Endpoint set for one Servant deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServantEndpoints {
	/// Authorization endpoint the browser is sent to.
	pub authorization: Url,
	/// Token endpoint used for authorization-code and refresh-token grants.
	pub token: Url,
	/// Base URL of the REST API (`/data/...` paths are appended).
	pub api: Url,
}
impl ServantEndpoints {
	/// Production authorize endpoint.
	pub const AUTHORIZATION: &'static str = "https://www.servant.co/connect/oauth2/authorize";
	/// Production token endpoint.
	pub const TOKEN: &'static str = "https://www.servant.co/connect/oauth2/token";
	/// Production API base for API version 0.
	pub const API: &'static str = "https://api0.servant.co";

	/// Creates a new builder.
	pub fn builder() -> ServantEndpointsBuilder {
		ServantEndpointsBuilder::default()
	}

	/// Endpoints of the public Servant deployment.
	pub fn production() -> Self {
		Self {
			authorization: Url::parse(Self::AUTHORIZATION)
				.expect("Production authorization endpoint should be a valid URL."),
			token: Url::parse(Self::TOKEN)
				.expect("Production token endpoint should be a valid URL."),
			api: Url::parse(Self::API).expect("Production API endpoint should be a valid URL."),
		}
	}

	/// Appends path segments to the API base, keeping any base path prefix.
	///
	/// Each segment is percent-encoded on its own, so a `/` inside one never adds a level.
	/// `.` and `..` are dropped by the URL parser and must be rejected by the caller.
	pub fn api_url<I>(&self, segments: I) -> Url
	where
		I: IntoIterator,
		I::Item: AsRef<str>,
	{
		let mut url = self.api.clone();

		// Validated endpoints always have a hierarchical path.
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}

		url
	}
}
impl Default for ServantEndpoints {
	fn default() -> Self {
		Self::production()
	}
}
