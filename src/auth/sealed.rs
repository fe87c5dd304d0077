//! Sealing (encrypting) secrets before persistence and opening them for outbound calls.
//!
//! Sealed values use the same record shape as the host framework's OAuth encryption:
//! `{iv, data, authTag, algorithm}` with base64 fields and AES-256-GCM as the only algorithm.

// crates.io
use aes_gcm::{
	Aes256Gcm,
	aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::Rng;
// self
use crate::{_prelude::*, auth::TokenSecret};

const AUTH_TAG_LEN: usize = 16;
const IV_LEN: usize = 12;

/// Errors raised while sealing or opening secrets.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SealError {
	/// Sealing key has the wrong size or encoding.
	#[error("Sealing key must be 32 bytes (64 hex characters).")]
	InvalidKey,
	/// Sealed record names an algorithm this sealer cannot open.
	#[error("Unsupported sealing algorithm `{algorithm}`.")]
	UnsupportedAlgorithm {
		/// Algorithm name found in the record.
		algorithm: String,
	},
	/// Sealed record fields are not valid base64 or have the wrong length.
	#[error("Sealed secret is malformed: {reason}.")]
	Malformed {
		/// Human-readable reason string.
		reason: String,
	},
	/// Encryption failed.
	#[error("Failed to seal secret.")]
	Seal,
	/// Authentication tag check failed or the key does not match.
	#[error("Failed to open sealed secret.")]
	Open,
}

/// Encrypted secret record safe to persist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedSecret {
	/// Base64 initialization vector.
	pub iv: String,
	/// Base64 ciphertext.
	pub data: String,
	/// Base64 GCM authentication tag.
	pub auth_tag: String,
	/// Algorithm label.
	pub algorithm: String,
}

/// Seals and opens secrets; implemented by the host's encryption layer.
pub trait SecretSealer
where
	Self: Send + Sync,
{
	/// Encrypts a secret for persistence.
	fn seal(&self, secret: &TokenSecret) -> Result<SealedSecret, SealError>;

	/// Decrypts a previously sealed secret.
	fn open(&self, sealed: &SealedSecret) -> Result<TokenSecret, SealError>;
}

/// AES-256-GCM sealer with a fresh random IV per secret.
#[derive(Clone)]
pub struct AesGcmSealer {
	cipher: Aes256Gcm,
}
impl AesGcmSealer {
	/// Algorithm label written into every sealed record.
	pub const ALGORITHM: &'static str = "aes-256-gcm";

	/// Builds a sealer from raw key bytes.
	pub fn new(key: &[u8; 32]) -> Self {
		let key: [u8; 32] = *key;

		Self { cipher: Aes256Gcm::new(&key.into()) }
	}

	/// Builds a sealer from a 64 character hex key.
	pub fn from_hex(key: &str) -> Result<Self, SealError> {
		let bytes = hex::decode(key.trim()).map_err(|_| SealError::InvalidKey)?;
		let key: [u8; 32] = bytes.try_into().map_err(|_| SealError::InvalidKey)?;

		Ok(Self::new(&key))
	}

	/// Generates a new random hex-encoded key.
	pub fn generate_key() -> String {
		let mut key = [0_u8; 32];

		rand::rng().fill(&mut key);

		hex::encode(key)
	}
}
impl Debug for AesGcmSealer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AesGcmSealer(..)")
	}
}
impl SecretSealer for AesGcmSealer {
	fn seal(&self, secret: &TokenSecret) -> Result<SealedSecret, SealError> {
		let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
		let mut sealed = self
			.cipher
			.encrypt(&nonce, secret.expose().as_bytes())
			.map_err(|_| SealError::Seal)?;
		let tag = sealed.split_off(sealed.len() - AUTH_TAG_LEN);

		Ok(SealedSecret {
			iv: STANDARD.encode(nonce),
			data: STANDARD.encode(&sealed),
			auth_tag: STANDARD.encode(tag),
			algorithm: Self::ALGORITHM.into(),
		})
	}

	fn open(&self, sealed: &SealedSecret) -> Result<TokenSecret, SealError> {
		if sealed.algorithm != Self::ALGORITHM {
			return Err(SealError::UnsupportedAlgorithm { algorithm: sealed.algorithm.clone() });
		}

		let iv = decode_field("iv", &sealed.iv)?;
		let iv: [u8; IV_LEN] = iv
			.try_into()
			.map_err(|_| SealError::Malformed { reason: format!("iv must be {IV_LEN} bytes") })?;
		let mut payload = decode_field("data", &sealed.data)?;
		let tag = decode_field("authTag", &sealed.auth_tag)?;

		if tag.len() != AUTH_TAG_LEN {
			return Err(SealError::Malformed {
				reason: format!("authTag must be {AUTH_TAG_LEN} bytes"),
			});
		}

		payload.extend_from_slice(&tag);

		let plaintext =
			self.cipher.decrypt(&iv.into(), payload.as_slice()).map_err(|_| SealError::Open)?;
		let plaintext = String::from_utf8(plaintext).map_err(|_| SealError::Malformed {
			reason: "plaintext is not valid UTF-8".into(),
		})?;

		Ok(TokenSecret::new(plaintext))
	}
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, SealError> {
	STANDARD
		.decode(value)
		.map_err(|e| SealError::Malformed { reason: format!("{name} is not base64 ({e})") })
}
