//! Crate-level error types shared across flows, the API client, sealing, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem (missing provider configuration, bad endpoints).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Sealing or opening a secret failed.
	#[error(transparent)]
	Seal(#[from] crate::auth::SealError),
	/// Token exchange with Servant failed.
	#[error("Failed to complete OAuth handshake with Servant. {0}")]
	OAuthHandshake(VendorFailure),
	/// Identity retrieval failed after a successful token exchange.
	#[error("Failed to fetch identity from Servant. {0}")]
	IdentityFetch(VendorFailure),
	/// Any other Servant API call failed.
	#[error("Servant API request failed. {0}")]
	Api(VendorFailure),

	/// Incoming OAuth query is unusable (no grant, or both grants at once).
	#[error("OAuth query is invalid: {reason}.")]
	InvalidQuery {
		/// Human-readable reason string.
		reason: String,
	},
	/// The `state` parameter could not be decoded.
	#[error("OAuth state parameter is invalid: {reason}.")]
	InvalidState {
		/// Human-readable reason string.
		reason: String,
	},
	/// An SDK call was rejected before reaching the network.
	#[error("Invalid argument for {operation}: {reason}.")]
	InvalidArgument {
		/// SDK operation name.
		operation: &'static str,
		/// Human-readable reason string.
		reason: String,
	},
	/// Credential secret does not match the stashed credential.
	#[error("Credential secret does not match the pending credential.")]
	CredentialMismatch,
}
impl Error {
	/// Returns the serializable classification of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Storage(_) => ErrorKind::Storage,
			Self::Config(_) => ErrorKind::Config,
			Self::Seal(_) => ErrorKind::Seal,
			Self::OAuthHandshake(_) => ErrorKind::OAuthHandshake,
			Self::IdentityFetch(_) => ErrorKind::IdentityFetch,
			Self::Api(_) => ErrorKind::Api,
			Self::InvalidQuery { .. } => ErrorKind::InvalidQuery,
			Self::InvalidState { .. } => ErrorKind::InvalidState,
			Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
			Self::CredentialMismatch => ErrorKind::CredentialMismatch,
		}
	}

	/// Vendor failure details, when the error originated from a Servant call.
	pub fn vendor_failure(&self) -> Option<&VendorFailure> {
		match self {
			Self::OAuthHandshake(failure) | Self::IdentityFetch(failure) | Self::Api(failure) =>
				Some(failure),
			_ => None,
		}
	}

	/// Original vendor response body, when one was received.
	pub fn vendor_response(&self) -> Option<&VendorPayload> {
		self.vendor_failure().and_then(|failure| failure.response.as_ref())
	}
}

/// Serializable error classification used when failures are stashed for later retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// See [`Error::Storage`].
	Storage,
	/// See [`Error::Config`].
	Config,
	/// See [`Error::Seal`].
	Seal,
	/// See [`Error::OAuthHandshake`].
	OAuthHandshake,
	/// See [`Error::IdentityFetch`].
	IdentityFetch,
	/// See [`Error::Api`].
	Api,
	/// See [`Error::InvalidQuery`].
	InvalidQuery,
	/// See [`Error::InvalidState`].
	InvalidState,
	/// See [`Error::InvalidArgument`].
	InvalidArgument,
	/// See [`Error::CredentialMismatch`].
	CredentialMismatch,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No provider configuration is stored for the service.
	#[error("Service `{service}` is not configured.")]
	MissingProviderConfig {
		/// Service name that was looked up.
		service: String,
	},
	/// No login handler is registered for the service.
	#[error("No login service is registered under `{service}`.")]
	UnknownService {
		/// Service name that was dispatched.
		service: String,
	},
	/// A login handler is already registered for the service.
	#[error("A login service is already registered under `{service}`.")]
	DuplicateService {
		/// Service name that was registered twice.
		service: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An endpoint URL could not be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint set failed validation.
	#[error(transparent)]
	Endpoints(#[from] crate::provider::EndpointsError),
	/// Requested permissions cannot be normalized.
	#[error("Requested permissions are invalid.")]
	InvalidPermission(#[from] crate::auth::PermissionError),
	/// Stored identifier failed validation.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Shorthand for [`ConfigError::MissingProviderConfig`].
	pub fn missing(service: impl Display) -> Self {
		Self::MissingProviderConfig { service: service.to_string() }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure reported by (or while talking to) the Servant API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{message}")]
pub struct VendorFailure {
	/// Human-readable summary of the failure.
	pub message: String,
	/// HTTP status code, when a response was received.
	pub status: Option<u16>,
	/// Original response body, kept unchanged for diagnostics.
	pub response: Option<VendorPayload>,
}
impl VendorFailure {
	/// Creates a failure without any response attached (transport errors).
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), status: None, response: None }
	}

	/// Attaches the HTTP status code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Attaches the original response body.
	pub fn with_response(mut self, response: VendorPayload) -> Self {
		self.response = Some(response);

		self
	}
}

/// Raw vendor response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorPayload(String);
impl VendorPayload {
	/// Wraps a body that has already been decoded as UTF-8.
	pub fn new(body: impl Into<String>) -> Self {
		Self(body.into())
	}

	/// Wraps raw bytes, replacing invalid UTF-8 sequences.
	pub fn from_bytes(body: &[u8]) -> Self {
		Self(String::from_utf8_lossy(body).into_owned())
	}

	/// Returns the body exactly as received.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Parses the body as JSON, if it is JSON.
	pub fn json(&self) -> Option<JsonValue> {
		serde_json::from_str(&self.0).ok()
	}
}
impl Display for VendorPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn handshake_message_keeps_vendor_summary() {
		let failure = VendorFailure::new("invalid_grant")
			.with_status(400)
			.with_response(VendorPayload::new("{\"error\":\"invalid_grant\"}"));
		let err = Error::OAuthHandshake(failure);

		assert_eq!(err.kind(), ErrorKind::OAuthHandshake);
		assert_eq!(
			err.to_string(),
			"Failed to complete OAuth handshake with Servant. invalid_grant"
		);
		assert_eq!(
			err.vendor_response().map(VendorPayload::as_str),
			Some("{\"error\":\"invalid_grant\"}")
		);
	}

	#[test]
	fn payload_json_is_optional() {
		assert!(VendorPayload::new("<html>").json().is_none());
		assert_eq!(
			VendorPayload::new("{\"a\":1}").json(),
			Some(serde_json::json!({ "a": 1 }))
		);
	}

	#[test]
	fn config_errors_are_not_vendor_failures() {
		let err: Error = ConfigError::missing("servant").into();

		assert_eq!(err.kind(), ErrorKind::Config);
		assert!(err.vendor_failure().is_none());
		assert_eq!(err.to_string(), "Service `servant` is not configured.");
	}
}
