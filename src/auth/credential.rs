//! Credential token/secret pair that binds a popup or redirect login back to its browser context.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const CREDENTIAL_LEN: usize = 43;

/// Random correlation value generated by the initiator and echoed back through `state`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialToken(String);
impl CredentialToken {
	/// Generates a fresh random token.
	pub fn generate() -> Self {
		Self(random_string(CREDENTIAL_LEN))
	}

	/// Wraps a token received from the browser.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the token value.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for CredentialToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CredentialToken({})", self.0)
	}
}
impl Display for CredentialToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Secret handed to the browser once the login completes; required to retrieve the outcome.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialSecret(String);
impl CredentialSecret {
	/// Generates a fresh random secret.
	pub fn generate() -> Self {
		Self(random_string(CREDENTIAL_LEN))
	}

	/// Wraps a secret received from the browser.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// SHA-256 digest (base64url, no padding) stored instead of the secret itself.
	pub fn digest(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(hasher.finalize())
	}
}
impl Debug for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CredentialSecret").field(&"<redacted>").finish()
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn generated_values_are_random_and_sized() {
		let a = CredentialToken::generate();
		let b = CredentialToken::generate();

		assert_eq!(a.as_str().len(), CREDENTIAL_LEN);
		assert_ne!(a, b);
		assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
	}

	#[test]
	fn secret_digest_is_stable_and_redacted() {
		let secret = CredentialSecret::new("s3cret");

		assert_eq!(secret.digest(), CredentialSecret::new("s3cret").digest());
		assert_ne!(secret.digest(), CredentialSecret::new("other").digest());
		assert_eq!(format!("{secret:?}"), "CredentialSecret(\"<redacted>\")");
	}
}
