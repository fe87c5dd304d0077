//! Server-side login handler: token exchange, identity fetch, and token sealing.
//!
//! One attempt walks `Pending -> TokenExchanged -> Identified`, or ends in `Failed` from either
//! of the first two states. The identity fetcher is only called after a successful exchange, and
//! nothing but the final [`LoginResult`] leaves the handler.

// self
use crate::{
	_prelude::*,
	api::{IdentityFetcher, ServantApi, ServantRef},
	auth::{SealedSecret, SecretSealer, ServiceName, UserId},
	config::ProviderConfig,
	error::ConfigError,
	oauth::{AuthorizationGrant, ServantTokenExchanger, TokenExchanger},
	obs::{self, FlowKind, FlowMeter, FlowSpan},
	provider::ServantEndpoints,
	store::{ConfigStore, CredentialStore, MemoryStore},
};

/// Query received on the OAuth callback.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationQuery {
	/// Authorization code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// Refresh token, for re-authentication without a browser round trip.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Encoded [`StateParam`](crate::flows::StateParam).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub state: Option<String>,
}
impl AuthorizationQuery {
	/// Query carrying an authorization code.
	pub fn code(code: impl Into<String>) -> Self {
		Self { code: Some(code.into()), ..Default::default() }
	}

	/// Query carrying a refresh token.
	pub fn refresh_token(token: impl Into<String>) -> Self {
		Self { refresh_token: Some(token.into()), ..Default::default() }
	}

	/// Attaches the encoded state.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Returns the single grant carried by the query.
	///
	/// Exactly one of `code` and `refresh_token` must be present and non-empty.
	pub fn grant(&self) -> Result<AuthorizationGrant> {
		let code = self.code.as_deref().filter(|value| !value.is_empty());
		let refresh = self.refresh_token.as_deref().filter(|value| !value.is_empty());

		match (code, refresh) {
			(Some(code), None) => Ok(AuthorizationGrant::Code(code.to_owned())),
			(None, Some(refresh)) => Ok(AuthorizationGrant::RefreshToken(refresh.to_owned())),
			(Some(_), Some(_)) => Err(Error::InvalidQuery {
				reason: "code and refresh_token are mutually exclusive".into(),
			}),
			(None, None) =>
				Err(Error::InvalidQuery {
					reason: "either code or refresh_token is required".into(),
				}),
		}
	}
}
impl Debug for AuthorizationQuery {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationQuery")
			.field("code_set", &self.code.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("state", &self.state)
			.finish()
	}
}

/// Progress of one login attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoginState {
	/// Query received.
	Pending,
	/// Token exchange succeeded.
	TokenExchanged,
	/// Identity fetched; terminal success.
	Identified,
	/// Terminal failure.
	Failed,
}
impl LoginState {
	/// Returns true if `next` is a legal successor of `self`.
	pub fn can_transition_to(self, next: LoginState) -> bool {
		matches!(
			(self, next),
			(Self::Pending, Self::TokenExchanged)
				| (Self::TokenExchanged, Self::Identified)
				| (Self::Pending | Self::TokenExchanged, Self::Failed)
		)
	}

	/// Returns true for `Identified` and `Failed`.
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Identified | Self::Failed)
	}

	/// Stage label used in spans.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::TokenExchanged => "token_exchanged",
			Self::Identified => "identified",
			Self::Failed => "failed",
		}
	}
}

/// `serviceData` handed to the host and persisted against the account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceData {
	/// Servant user identifier.
	pub id: UserId,
	/// Sealed access token.
	#[serde(rename = "accessToken")]
	pub access_token: SealedSecret,
	/// Email address.
	pub email: String,
}

/// Profile fragment merged into the host account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Servants the user granted access to.
	#[serde(default)]
	pub servants: Vec<ServantRef>,
}

/// `options` half of a login result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginOptions {
	/// Profile fragment.
	pub profile: Profile,
}

/// Normalized result of a successful login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
	/// Record persisted against the account.
	#[serde(rename = "serviceData")]
	pub service_data: ServiceData,
	/// Profile options.
	pub options: LoginOptions,
}

/// Login handler for the `servant` service.
///
/// Collaborators are injected; the handler keeps no mutable state besides the pending-credential
/// store used by [`LoginService::complete`].
#[derive(Clone)]
pub struct LoginService {
	/// Provider configuration, immutable for the lifetime of the handler.
	pub config: Arc<ProviderConfig>,
	pub(crate) exchanger: Arc<dyn TokenExchanger>,
	pub(crate) fetcher: Arc<dyn IdentityFetcher>,
	pub(crate) sealer: Arc<dyn SecretSealer>,
	pub(crate) credentials: Arc<dyn CredentialStore>,
	pub(crate) credential_validity: Duration,
}
impl LoginService {
	/// Default lifetime of a stashed credential.
	pub const DEFAULT_CREDENTIAL_VALIDITY: Duration = Duration::seconds(60);

	/// Creates a handler from explicit collaborators, with an in-memory credential store.
	pub fn new(
		config: impl Into<Arc<ProviderConfig>>,
		exchanger: Arc<dyn TokenExchanger>,
		fetcher: Arc<dyn IdentityFetcher>,
		sealer: Arc<dyn SecretSealer>,
	) -> Self {
		Self {
			config: config.into(),
			exchanger,
			fetcher,
			sealer,
			credentials: Arc::new(MemoryStore::default()),
			credential_validity: Self::DEFAULT_CREDENTIAL_VALIDITY,
		}
	}

	/// Creates a handler wired to the real Servant endpoints.
	pub fn servant(
		config: impl Into<Arc<ProviderConfig>>,
		endpoints: &ServantEndpoints,
		sealer: Arc<dyn SecretSealer>,
	) -> Result<Self> {
		endpoints.validate().map_err(ConfigError::from)?;

		let exchanger = ServantTokenExchanger::new(endpoints)?;
		let api = ServantApi::new(endpoints.clone())?;

		Ok(Self::new(config, Arc::new(exchanger), Arc::new(api), sealer))
	}

	/// Loads the configuration for `servant` once from `store`.
	///
	/// Fails with [`ConfigError::MissingProviderConfig`] when no record exists.
	pub async fn from_store(
		store: &dyn ConfigStore,
		exchanger: Arc<dyn TokenExchanger>,
		fetcher: Arc<dyn IdentityFetcher>,
		sealer: Arc<dyn SecretSealer>,
	) -> Result<Self> {
		let service = ServiceName::servant();
		let config = store.fetch(&service).await?.ok_or_else(|| ConfigError::missing(&service))?;

		Ok(Self::new(config, exchanger, fetcher, sealer))
	}

	/// Replaces the pending-credential store.
	pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.credentials = store;

		self
	}

	/// Overrides how long stashed credentials stay retrievable.
	pub fn with_credential_validity(mut self, validity: Duration) -> Self {
		self.credential_validity = validity;

		self
	}

	/// Runs one login attempt for an incoming OAuth query.
	pub async fn handle(&self, query: &AuthorizationQuery) -> Result<LoginResult> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "handle");
		let meter = FlowMeter::start(KIND);
		let mut state = LoginState::Pending;
		let result = span.instrument(self.run(query, &mut state)).await;

		obs::finish_flow(meter, "handle", &result);

		result
	}

	/// Opens the sealed token in `service_data` and fetches the current servants list.
	pub async fn sync_servants(&self, service_data: &ServiceData) -> Result<Vec<ServantRef>> {
		const KIND: FlowKind = FlowKind::Api;

		let span = FlowSpan::new(KIND, "sync_servants");
		let meter = FlowMeter::start(KIND);

		let result = span
			.instrument(async move {
				let token = self.sealer.open(&service_data.access_token)?;
				let identity = self.fetcher.fetch_identity(&token).await?;

				Ok(identity.servants)
			})
			.await;

		obs::finish_flow(meter, "sync_servants", &result);

		result
	}

	async fn run(&self, query: &AuthorizationQuery, state: &mut LoginState) -> Result<LoginResult> {
		let result = self.attempt(query, state).await;

		if result.is_err() {
			advance(state, LoginState::Failed);
		}

		result
	}

	async fn attempt(
		&self,
		query: &AuthorizationQuery,
		state: &mut LoginState,
	) -> Result<LoginResult> {
		let grant = query.grant()?;
		let credentials = self.config.credentials(self.sealer.as_ref())?;
		let tokens = self.exchanger.exchange(&credentials, &grant).await?;

		advance(state, LoginState::TokenExchanged);

		let identity = self.fetcher.fetch_identity(&tokens.access_token).await?;
		let access_token = self.sealer.seal(&tokens.access_token)?;

		advance(state, LoginState::Identified);

		Ok(LoginResult {
			service_data: ServiceData { id: identity.user_id, access_token, email: identity.email },
			options: LoginOptions {
				profile: Profile { name: identity.full_name, servants: identity.servants },
			},
		})
	}
}
impl Debug for LoginService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginService")
			.field("service", &self.config.service)
			.field("client_id", &self.config.client_id)
			.field("credential_validity", &self.credential_validity)
			.finish()
	}
}

fn advance(state: &mut LoginState, next: LoginState) {
	debug_assert!(state.can_transition_to(next), "Illegal login transition {state:?} -> {next:?}.");

	#[cfg(feature = "tracing")]
	tracing::debug!(from = state.as_str(), to = next.as_str(), "login state changed");

	*state = next;
}
