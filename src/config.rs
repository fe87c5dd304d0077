//! Provider configuration records as persisted by the host's configuration store.

// self
use crate::{
	_prelude::*,
	auth::{SealedSecret, SecretSealer, ServiceName, TokenSecret},
	flows::LoginStyle,
};

/// Client secret as stored: either sealed at rest or plain text.
///
/// Plain values are accepted because the host only seals secrets when an encryption key is
/// configured; opening a plain value returns it unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigSecret {
	/// Encrypted secret record.
	Sealed(SealedSecret),
	/// Unencrypted secret.
	Plain(String),
}
impl ConfigSecret {
	/// Opens the secret for an outbound call.
	pub fn open(&self, sealer: &dyn SecretSealer) -> Result<TokenSecret> {
		match self {
			Self::Sealed(sealed) => Ok(sealer.open(sealed)?),
			Self::Plain(value) => Ok(TokenSecret::new(value.as_str())),
		}
	}

	/// Returns true if the secret is sealed at rest.
	pub fn is_sealed(&self) -> bool {
		matches!(self, Self::Sealed(_))
	}
}
impl Debug for ConfigSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Sealed(_) => f.write_str("ConfigSecret::Sealed(..)"),
			Self::Plain(_) => f.write_str("ConfigSecret::Plain(<redacted>)"),
		}
	}
}

/// Persisted credentials for one login service (`{service, clientId, secret}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Service name the record is keyed by.
	pub service: ServiceName,
	/// OAuth client identifier issued by Servant.
	#[serde(rename = "clientId", alias = "client_id")]
	pub client_id: String,
	/// OAuth client secret issued by Servant.
	#[serde(alias = "client_secret")]
	pub secret: ConfigSecret,
	/// Preferred login style configured for the service.
	#[serde(rename = "loginStyle", default, skip_serializing_if = "Option::is_none")]
	pub login_style: Option<LoginStyle>,
}
impl ProviderConfig {
	/// Creates a `servant` configuration with a plain secret.
	pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
		Self {
			service: ServiceName::servant(),
			client_id: client_id.into(),
			secret: ConfigSecret::Plain(secret.into()),
			login_style: None,
		}
	}

	/// Replaces the secret with a sealed copy.
	pub fn seal_secret(mut self, sealer: &dyn SecretSealer) -> Result<Self> {
		if let ConfigSecret::Plain(value) = &self.secret {
			let sealed = sealer.seal(&TokenSecret::new(value.as_str()))?;

			self.secret = ConfigSecret::Sealed(sealed);
		}

		Ok(self)
	}

	/// Overrides the service name.
	pub fn with_service(mut self, service: ServiceName) -> Self {
		self.service = service;

		self
	}

	/// Sets the preferred login style.
	pub fn with_login_style(mut self, style: LoginStyle) -> Self {
		self.login_style = Some(style);

		self
	}

	/// Opens the secret and returns the credentials used for outbound calls.
	pub fn credentials(&self, sealer: &dyn SecretSealer) -> Result<ClientCredentials> {
		Ok(ClientCredentials {
			client_id: self.client_id.clone(),
			client_secret: self.secret.open(sealer)?,
		})
	}
}

/// Opened client credentials; only lives for the duration of one outbound call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Creates credentials from raw values.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: TokenSecret::new(client_secret) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::AesGcmSealer;

	#[test]
	fn records_accept_both_field_spellings() {
		let camel: ProviderConfig =
			serde_json::from_str(r#"{"service":"servant","clientId":"abc","secret":"shh"}"#)
				.expect("Camel-case record should deserialize.");
		let snake: ProviderConfig = serde_json::from_str(
			r#"{"service":"servant","client_id":"abc","client_secret":"shh"}"#,
		)
		.expect("Snake-case record should deserialize.");

		assert_eq!(camel, snake);
		assert_eq!(camel, ProviderConfig::new("abc", "shh"));
	}

	#[test]
	fn sealed_secret_round_trips_through_json() {
		let sealer = AesGcmSealer::new(&[1_u8; 32]);
		let config =
			ProviderConfig::new("abc", "shh").seal_secret(&sealer).expect("Sealing should work.");

		assert!(config.secret.is_sealed());

		let json = serde_json::to_string(&config).expect("Config should serialize.");
		let back: ProviderConfig = serde_json::from_str(&json).expect("Config should deserialize.");
		let credentials = back.credentials(&sealer).expect("Sealed secret should open.");

		assert_eq!(credentials, ClientCredentials::new("abc", "shh"));
	}

	#[test]
	fn debug_output_never_prints_secrets() {
		let config = ProviderConfig::new("abc", "shh");

		assert!(!format!("{config:?}").contains("shh"));
	}
}
