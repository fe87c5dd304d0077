//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::MockServer;
use reqwest::Client as ReqwestClient;
use url::Url;
// self
use servant_login::{
	api::{ApiFuture, Identity, IdentityFetcher, ServantApi, ServantRef},
	auth::{AesGcmSealer, TokenSecret, UserId},
	config::{ClientCredentials, ProviderConfig},
	error::{Error, VendorFailure},
	flows::LoginService,
	http::ReqwestHttpClient,
	oauth::{AuthorizationGrant, ExchangeFuture, ServantTokenExchanger, TokenExchanger, TokenGrant},
	provider::ServantEndpoints,
};

pub const CLIENT_ID: &str = "abc";
pub const CLIENT_SECRET: &str = "shh";
pub const SEALING_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Reqwest client that trusts the self-signed certificates httpmock serves.
pub fn test_reqwest_client() -> ReqwestClient {
	ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.")
}

pub fn sealer() -> Arc<AesGcmSealer> {
	Arc::new(AesGcmSealer::from_hex(SEALING_KEY).expect("Sealing key fixture should be valid."))
}

/// Endpoint set whose token endpoint and API base both live on the mock server.
pub fn mock_endpoints(server: &MockServer) -> ServantEndpoints {
	ServantEndpoints::builder()
		.token_endpoint(
			Url::parse(&server.url("/connect/oauth2/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.api_base(Url::parse(&server.base_url()).expect("Mock API base should parse successfully."))
		.build()
		.expect("Loopback endpoints should pass validation.")
}

pub fn mock_api(server: &MockServer) -> ServantApi {
	ServantApi::with_client(test_reqwest_client(), mock_endpoints(server))
}

/// Login handler wired to the mock server through the real exchanger and API client.
pub fn mock_login_service(server: &MockServer) -> LoginService {
	let endpoints = mock_endpoints(server);
	let exchanger = ServantTokenExchanger::<ReqwestHttpClient>::with_http_client(
		&endpoints,
		ReqwestHttpClient::with_client(test_reqwest_client()),
	)
	.expect("Exchanger should build for mock endpoints.");
	let api = ServantApi::with_client(test_reqwest_client(), endpoints);

	LoginService::new(
		ProviderConfig::new(CLIENT_ID, CLIENT_SECRET),
		Arc::new(exchanger),
		Arc::new(api),
		sealer(),
	)
}

/// Exchanger answering every grant with the same access token.
#[derive(Debug, Default)]
pub struct StaticExchanger {
	pub calls: AtomicUsize,
	pub fail: bool,
}
impl StaticExchanger {
	pub fn failing() -> Self {
		Self { fail: true, ..Default::default() }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenExchanger for StaticExchanger {
	fn exchange<'a>(
		&'a self,
		credentials: &'a ClientCredentials,
		_grant: &'a AuthorizationGrant,
	) -> ExchangeFuture<'a, TokenGrant> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			assert_eq!(credentials.client_id, CLIENT_ID);

			if self.fail {
				return Err(Error::OAuthHandshake(
					VendorFailure::new("invalid_grant").with_status(400),
				));
			}

			Ok(TokenGrant::new("tok1"))
		})
	}
}

/// Fetcher returning a fixed identity for `tok1`.
#[derive(Debug, Default)]
pub struct StaticFetcher {
	pub calls: AtomicUsize,
}
impl StaticFetcher {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl IdentityFetcher for StaticFetcher {
	fn fetch_identity<'a>(&'a self, access_token: &'a TokenSecret) -> ApiFuture<'a, Identity> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			assert_eq!(access_token.expose(), "tok1");

			Ok(Identity {
				user_id: UserId::new("u1").expect("User identifier fixture should be valid."),
				email: "a@b.com".into(),
				full_name: Some("A B".into()),
				servants: vec![ServantRef::new("s1")],
			})
		})
	}
}

/// Login handler backed by the static fakes.
pub fn static_login_service(
	exchanger: Arc<StaticExchanger>,
	fetcher: Arc<StaticFetcher>,
) -> LoginService {
	LoginService::new(ProviderConfig::new(CLIENT_ID, CLIENT_SECRET), exchanger, fetcher, sealer())
}
