//! Client-side login initiation: authorize URL, credential token, and hand-off to the launcher.

// self
use crate::{
	_prelude::*,
	auth::{CredentialToken, PermissionSet, ServiceName},
	config::ProviderConfig,
	error::ConfigError,
	flows::{LoginStyle, StateParam},
	obs::{self, FlowKind, FlowMeter, FlowSpan},
	provider::ServantEndpoints,
};

/// Size of the login popup window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupOptions {
	/// Window width in pixels.
	pub width: u32,
	/// Window height in pixels.
	pub height: u32,
}
impl Default for PopupOptions {
	fn default() -> Self {
		Self { width: 900, height: 450 }
	}
}

/// Options accepted by [`LoginInitiator::request_credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialRequestOptions {
	/// Permissions requested from Servant.
	pub request_permissions: PermissionSet,
	/// Explicit login style; overrides the configured one.
	pub login_style: Option<LoginStyle>,
	/// Page to return to after a redirect-style login.
	pub redirect_url: Option<Url>,
	/// True when running inside a Cordova shell.
	pub is_cordova: bool,
}

/// Everything the host launcher needs to start a login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
	/// Service being logged into.
	pub login_service: ServiceName,
	/// Resolved presentation style.
	pub login_style: LoginStyle,
	/// Authorize URL to open.
	pub login_url: Url,
	/// Token the completion callback is correlated by.
	pub credential_token: CredentialToken,
	/// Popup window size.
	pub popup_options: PopupOptions,
}

/// Host utility that opens the popup or performs the redirect.
pub trait LoginLauncher
where
	Self: Send + Sync,
{
	/// Returns false when the environment cannot open popups.
	fn supports_popup(&self) -> bool {
		true
	}

	/// Starts the login.
	fn launch(&self, request: LaunchRequest) -> Result<()>;
}

/// Builds authorize URLs and hands them to a [`LoginLauncher`].
#[derive(Clone)]
pub struct LoginInitiator {
	endpoints: ServantEndpoints,
	launcher: Arc<dyn LoginLauncher>,
	popup_options: PopupOptions,
}
impl LoginInitiator {
	/// Creates an initiator targeting the production endpoints.
	pub fn new(launcher: Arc<dyn LoginLauncher>) -> Self {
		Self {
			endpoints: ServantEndpoints::production(),
			launcher,
			popup_options: Default::default(),
		}
	}

	/// Overrides the endpoint set.
	pub fn with_endpoints(mut self, endpoints: ServantEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the popup size.
	pub fn with_popup_options(mut self, popup_options: PopupOptions) -> Self {
		self.popup_options = popup_options;

		self
	}

	/// Starts a login and returns the credential token the outcome will be stashed under.
	///
	/// Fails with [`ConfigError::MissingProviderConfig`] before touching the launcher when no
	/// configuration is available.
	pub fn request_credential(
		&self,
		config: Option<&ProviderConfig>,
		options: &CredentialRequestOptions,
	) -> Result<CredentialToken> {
		const KIND: FlowKind = FlowKind::Initiate;

		let _guard = FlowSpan::new(KIND, "request_credential").entered();
		let meter = FlowMeter::start(KIND);

		let result = self.launch(config, options);

		obs::finish_flow(meter, "request_credential", &result);

		result
	}

	/// Builds `<authorize>?response_type=code&client_id=..&state=..[&scope=a+b]`.
	pub fn login_url(&self, client_id: &str, state: &str, permissions: &PermissionSet) -> Url {
		let mut url = self.endpoints.authorization.clone();

		url.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", client_id)
			.append_pair("state", state);

		// Items are already form-encoded; `+` must survive as the delimiter.
		if let Some(scope) = permissions.encoded() {
			let query = format!("{}&scope={scope}", url.query().unwrap_or_default());

			url.set_query(Some(&query));
		}

		url
	}

	fn launch(
		&self,
		config: Option<&ProviderConfig>,
		options: &CredentialRequestOptions,
	) -> Result<CredentialToken> {
		let config = config.ok_or_else(|| ConfigError::missing(ServiceName::SERVANT))?;
		let credential_token = CredentialToken::generate();
		let login_style = LoginStyle::resolve(
			options.login_style,
			config.login_style,
			self.launcher.supports_popup(),
		);
		let mut state = StateParam::new(login_style, credential_token.clone())
			.with_cordova(options.is_cordova);

		if let Some(redirect_url) = &options.redirect_url {
			state = state.with_redirect_url(redirect_url.clone());
		}

		let login_url =
			self.login_url(&config.client_id, &state.encode()?, &options.request_permissions);

		self.launcher.launch(LaunchRequest {
			login_service: config.service.clone(),
			login_style,
			login_url,
			credential_token: credential_token.clone(),
			popup_options: self.popup_options,
		})?;

		Ok(credential_token)
	}
}
impl Debug for LoginInitiator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginInitiator")
			.field("endpoints", &self.endpoints)
			.field("popup_options", &self.popup_options)
			.finish()
	}
}
