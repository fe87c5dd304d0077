//! Types shared by the initiator and the completion side of a login: the presentation style and
//! the `state` parameter that round-trips through Servant.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, auth::CredentialToken};

/// How the authorize page is presented to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStyle {
	/// Separate popup window; the opener polls for the credential.
	Popup,
	/// Full-page redirect back to the application.
	Redirect,
}
impl LoginStyle {
	/// Resolves the style from the request options, then the stored configuration, defaulting to
	/// popup. Falls back to redirect when the environment cannot open popups.
	pub fn resolve(
		requested: Option<LoginStyle>,
		configured: Option<LoginStyle>,
		popup_supported: bool,
	) -> Self {
		match requested.or(configured).unwrap_or(Self::Popup) {
			Self::Popup if !popup_supported => Self::Redirect,
			style => style,
		}
	}

	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Popup => "popup",
			Self::Redirect => "redirect",
		}
	}
}
impl Display for LoginStyle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Contents of the `state` query parameter (JSON, base64 encoded).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateParam {
	/// Style the login was launched with.
	pub login_style: LoginStyle,
	/// Token correlating the callback with the initiating browser context.
	pub credential_token: CredentialToken,
	/// True when launched from a Cordova shell.
	#[serde(default)]
	pub is_cordova: bool,
	/// Page to return to after a redirect-style login.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub redirect_url: Option<Url>,
}
impl StateParam {
	/// Creates a state for the given style and token.
	pub fn new(login_style: LoginStyle, credential_token: CredentialToken) -> Self {
		Self { login_style, credential_token, is_cordova: false, redirect_url: None }
	}

	/// Sets the page to return to after a redirect-style login.
	pub fn with_redirect_url(mut self, url: Url) -> Self {
		self.redirect_url = Some(url);

		self
	}

	/// Marks the login as launched from a Cordova shell.
	pub fn with_cordova(mut self, is_cordova: bool) -> Self {
		self.is_cordova = is_cordova;

		self
	}

	/// Encodes the state for the authorize URL.
	pub fn encode(&self) -> Result<String> {
		let json = serde_json::to_vec(self)
			.map_err(|e| Error::InvalidState { reason: format!("failed to serialize: {e}") })?;

		Ok(STANDARD.encode(json))
	}

	/// Decodes a state received on the callback.
	pub fn decode(raw: &str) -> Result<Self> {
		let bytes = STANDARD
			.decode(raw.trim())
			.map_err(|e| Error::InvalidState { reason: format!("not base64: {e}") })?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| Error::InvalidState {
			reason: format!("invalid JSON at {}: {}", e.path(), e.inner()),
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn style_resolution_order() {
		assert_eq!(LoginStyle::resolve(None, None, true), LoginStyle::Popup);
		assert_eq!(
			LoginStyle::resolve(None, Some(LoginStyle::Redirect), true),
			LoginStyle::Redirect
		);
		assert_eq!(
			LoginStyle::resolve(Some(LoginStyle::Popup), Some(LoginStyle::Redirect), true),
			LoginStyle::Popup
		);
		assert_eq!(LoginStyle::resolve(None, None, false), LoginStyle::Redirect);
	}

	#[test]
	fn state_round_trips_through_base64_json() {
		let state = StateParam::new(LoginStyle::Redirect, CredentialToken::new("tok"))
			.with_redirect_url(
				Url::parse("https://app.example.com/after").expect("URL should parse."),
			);
		let encoded = state.encode().expect("State should encode.");
		let json = STANDARD.decode(&encoded).expect("Encoded state should be base64.");
		let value: JsonValue =
			serde_json::from_slice(&json).expect("Encoded state should be JSON.");

		assert_eq!(value["loginStyle"], "redirect");
		assert_eq!(value["credentialToken"], "tok");
		assert_eq!(value["isCordova"], false);
		assert_eq!(StateParam::decode(&encoded).expect("State should decode."), state);
	}

	#[test]
	fn garbage_state_is_rejected() {
		let err = StateParam::decode("%%%").expect_err("Garbage should not decode.");

		assert!(matches!(err, Error::InvalidState { .. }));

		let err = StateParam::decode(&STANDARD.encode(r#"{"loginStyle":"popup"}"#))
			.expect_err("Missing token should not decode.");

		assert!(err.to_string().contains("credentialToken"));
	}
}
