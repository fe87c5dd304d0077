//! Token exchange against the Servant token endpoint.
//!
//! [`ServantTokenExchanger`] wraps an `oauth2` client configured with Servant's token endpoint and
//! a capturing [`TokenHttpClient`]. Each call performs exactly one token-endpoint request for
//! either the authorization-code or the refresh-token grant; every failure (transport, OAuth error
//! response, unparsable body) becomes [`Error::OAuthHandshake`] with the HTTP status and the raw
//! body attached. Nothing is retried.

pub use oauth2;

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AccessToken, AuthType, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
	TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientCredentials,
	error::{ConfigError, VendorFailure},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::ServantEndpoints,
};

type ServantOAuthClient = Client<
	BasicErrorResponse,
	ServantTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Boxed future returned by [`TokenExchanger`] implementations.
pub type ExchangeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Grant presented to the token endpoint. The two variants are mutually exclusive.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthorizationGrant {
	/// Authorization code returned through the redirect.
	Code(String),
	/// Refresh token issued by an earlier exchange.
	RefreshToken(String),
}
impl AuthorizationGrant {
	/// Grant type label used in logs and metrics.
	pub fn grant_type(&self) -> &'static str {
		match self {
			Self::Code(_) => "authorization_code",
			Self::RefreshToken(_) => "refresh_token",
		}
	}
}
impl Debug for AuthorizationGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Code(_) => f.write_str("AuthorizationGrant::Code(<redacted>)"),
			Self::RefreshToken(_) => f.write_str("AuthorizationGrant::RefreshToken(<redacted>)"),
		}
	}
}

/// Tokens issued by a successful exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
	/// Access token used for API calls.
	pub access_token: TokenSecret,
	/// Refresh token, when Servant issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Relative lifetime of the access token, when reported.
	pub expires_in: Option<Duration>,
}
impl TokenGrant {
	/// Creates a grant holding only an access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None, expires_in: None }
	}
}

/// Converts an authorization code or refresh token into tokens with one vendor call.
pub trait TokenExchanger
where
	Self: Send + Sync,
{
	/// Performs the exchange.
	fn exchange<'a>(
		&'a self,
		credentials: &'a ClientCredentials,
		grant: &'a AuthorizationGrant,
	) -> ExchangeFuture<'a, TokenGrant>;
}

/// Token response accepted from Servant.
///
/// Only `access_token` is required; `token_type` defaults to bearer when Servant omits it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServantTokenResponse {
	access_token: AccessToken,
	#[serde(default = "bearer", skip_serializing_if = "is_bearer")]
	token_type: BasicTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
}
impl TokenResponse for ServantTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<StdDuration> {
		self.expires_in.map(StdDuration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

/// [`TokenExchanger`] backed by `oauth2` and a [`TokenHttpClient`].
pub struct ServantTokenExchanger<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	token_url: TokenUrl,
	http_client: Arc<C>,
}
impl<C> ServantTokenExchanger<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an exchanger for the endpoint set using the provided transport.
	pub fn with_http_client(
		endpoints: &ServantEndpoints,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Ok(Self { token_url, http_client: http_client.into() })
	}

	fn oauth_client(&self, credentials: &ClientCredentials) -> ServantOAuthClient {
		Client::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(self.token_url.clone())
	}
}
impl ServantTokenExchanger<ReqwestHttpClient> {
	/// Creates an exchanger with its own reqwest transport.
	///
	/// Redirects are disabled because the token endpoint answers directly.
	pub fn new(endpoints: &ServantEndpoints) -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Self::with_http_client(endpoints, ReqwestHttpClient::with_client(client))
	}
}
impl<C> TokenExchanger for ServantTokenExchanger<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn exchange<'a>(
		&'a self,
		credentials: &'a ClientCredentials,
		grant: &'a AuthorizationGrant,
	) -> ExchangeFuture<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let client = self.oauth_client(credentials);
			let response = match grant {
				AuthorizationGrant::Code(code) =>
					client
						.exchange_code(AuthorizationCode::new(code.clone()))
						.request_async(&instrumented)
						.await,
				AuthorizationGrant::RefreshToken(token) => {
					let refresh = RefreshToken::new(token.clone());

					client.exchange_refresh_token(&refresh).request_async(&instrumented).await
				},
			}
			.map_err(|err| map_request_error(meta.take(), err))?;

			Ok(map_token_response(response))
		})
	}
}
impl<C> Debug for ServantTokenExchanger<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServantTokenExchanger")
			.field("token_url", &self.token_url.as_str())
			.finish()
	}
}

fn map_token_response(response: ServantTokenResponse) -> TokenGrant {
	TokenGrant {
		access_token: TokenSecret::new(response.access_token().secret().as_str()),
		refresh_token: response
			.refresh_token()
			.map(|token| TokenSecret::new(token.secret().as_str())),
		expires_in: response
			.expires_in()
			.and_then(|secs| i64::try_from(secs.as_secs()).ok())
			.map(Duration::seconds),
	}
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let message = match &err {
		RequestTokenError::ServerResponse(response) => match response.error_description() {
			Some(description) => format!("{}: {description}", response.error().as_ref()),
			None => response.error().as_ref().to_owned(),
		},
		RequestTokenError::Request(inner) => format!("Transport error: {inner}"),
		RequestTokenError::Parse(inner, _) =>
			format!("Token response could not be parsed: {}", inner.inner()),
		RequestTokenError::Other(message) => format!("Unexpected token response: {message}"),
	};
	let mut failure = VendorFailure::new(message);

	if let Some(meta) = meta {
		if let Some(status) = meta.status {
			failure = failure.with_status(status);
		}
		if let Some(body) = meta.body {
			failure = failure.with_response(body);
		}
	}

	Error::OAuthHandshake(failure)
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

fn is_bearer(token_type: &BasicTokenType) -> bool {
	matches!(token_type, BasicTokenType::Bearer)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_response_only_requires_access_token() {
		let response: ServantTokenResponse =
			serde_json::from_str(r#"{"access_token":"tok1"}"#).expect("Minimal body should parse.");
		let grant = map_token_response(response);

		assert_eq!(grant, TokenGrant::new("tok1"));
	}

	#[test]
	fn token_response_keeps_refresh_and_expiry() {
		let response: ServantTokenResponse = serde_json::from_str(
			r#"{"access_token":"tok1","token_type":"Bearer","expires_in":3600,"refresh_token":"r1"}"#,
		)
		.expect("Full body should parse.");
		let grant = map_token_response(response);

		assert_eq!(grant.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
		assert_eq!(grant.expires_in, Some(Duration::hours(1)));
	}

	#[test]
	fn grant_debug_is_redacted() {
		let grant = AuthorizationGrant::Code("xyz".into());

		assert!(!format!("{grant:?}").contains("xyz"));
		assert_eq!(grant.grant_type(), "authorization_code");
	}

	#[test]
	fn exchanger_builds_for_production_endpoints() {
		let exchanger = ServantTokenExchanger::new(&ServantEndpoints::production())
			.expect("Production endpoints should build an exchanger.");

		assert!(format!("{exchanger:?}").contains("www.servant.co"));
	}
}
