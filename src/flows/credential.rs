//! Pending-credential hand-off between the OAuth callback and the browser that started the login.
//!
//! [`LoginService::complete`] runs the handler and stashes its outcome, success or failure, under
//! the credential token from the `state` parameter, guarded by a fresh credential secret.
//! [`LoginService::retrieve_credential`] hands the outcome out exactly once, and only within the
//! validity window.

// self
use crate::{
	_prelude::*,
	auth::{CredentialSecret, CredentialToken},
	error::{ErrorKind, VendorFailure},
	flows::{AuthorizationQuery, LoginResult, LoginService, StateParam},
	obs::{self, FlowKind, FlowMeter, FlowSpan},
	store::{PendingCredential, TakeOutcome},
};

/// Stashed outcome of one login attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CredentialOutcome {
	/// The login succeeded.
	Success(LoginResult),
	/// The login failed.
	Failure(StashedFailure),
}
impl CredentialOutcome {
	/// Returns true for [`CredentialOutcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}
}
impl From<Result<LoginResult>> for CredentialOutcome {
	fn from(result: Result<LoginResult>) -> Self {
		match result {
			Ok(login) => Self::Success(login),
			Err(e) => Self::Failure(StashedFailure::from(&e)),
		}
	}
}

/// Serializable copy of a login failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashedFailure {
	/// Error classification.
	pub kind: ErrorKind,
	/// Human-readable message.
	pub message: String,
	/// Vendor status and payload, when the failure came from Servant.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vendor: Option<VendorFailure>,
}
impl From<&Error> for StashedFailure {
	fn from(error: &Error) -> Self {
		Self {
			kind: error.kind(),
			message: error.to_string(),
			vendor: error.vendor_failure().cloned(),
		}
	}
}

/// What the callback endpoint needs to finish the browser side of a login.
#[derive(Clone, Debug)]
pub struct CompletedLogin {
	/// Decoded `state` parameter.
	pub state: StateParam,
	/// Secret the browser presents to retrieve the outcome.
	pub credential_secret: CredentialSecret,
	/// True if the stashed outcome is a success.
	pub succeeded: bool,
}

impl LoginService {
	/// Runs the handler for a callback query and stashes the outcome for retrieval.
	///
	/// Login failures are stashed rather than returned; the error path only covers an unusable
	/// `state` and storage failures.
	pub async fn complete(&self, query: &AuthorizationQuery) -> Result<CompletedLogin> {
		let raw_state = query
			.state
			.as_deref()
			.ok_or_else(|| Error::InvalidState { reason: "state parameter is missing".into() })?;
		let state = StateParam::decode(raw_state)?;
		let outcome = CredentialOutcome::from(self.handle(query).await);
		let succeeded = outcome.is_success();
		let credential_secret = CredentialSecret::generate();
		let now = OffsetDateTime::now_utc();

		self.credentials.purge_created_before(now - self.credential_validity).await?;
		self.credentials
			.stash(
				state.credential_token.clone(),
				PendingCredential {
					secret_digest: credential_secret.digest(),
					created_at: now,
					outcome,
				},
			)
			.await?;

		Ok(CompletedLogin { state, credential_secret, succeeded })
	}

	/// Hands out a stashed outcome once.
	///
	/// Returns `Ok(None)` when nothing is stashed under the token or the entry expired, and
	/// [`Error::CredentialMismatch`] when the secret is wrong.
	pub async fn retrieve_credential(
		&self,
		token: &CredentialToken,
		secret: &CredentialSecret,
	) -> Result<Option<CredentialOutcome>> {
		const KIND: FlowKind = FlowKind::Retrieve;

		let span = FlowSpan::new(KIND, "retrieve_credential");
		let meter = FlowMeter::start(KIND);

		let result = span
			.instrument(async move {
				let digest = secret.digest();
				let cutoff = OffsetDateTime::now_utc() - self.credential_validity;

				match self.credentials.take(token, &digest).await? {
					TakeOutcome::Taken(pending) if pending.created_at >= cutoff =>
						Ok(Some(pending.outcome)),
					TakeOutcome::Taken(_) | TakeOutcome::Missing => Ok(None),
					TakeOutcome::SecretMismatch => Err(Error::CredentialMismatch),
				}
			})
			.await;

		obs::finish_flow(meter, "retrieve_credential", &result);

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ConfigError;

	#[test]
	fn failures_keep_kind_message_and_vendor_payload() {
		let failure = VendorFailure::new("denied").with_status(401);
		let outcome = CredentialOutcome::from(Err(Error::OAuthHandshake(failure.clone())));
		let CredentialOutcome::Failure(stashed) = outcome else {
			panic!("Error should stash as a failure.");
		};

		assert_eq!(stashed.kind, ErrorKind::OAuthHandshake);
		assert_eq!(stashed.message, "Failed to complete OAuth handshake with Servant. denied");
		assert_eq!(stashed.vendor, Some(failure));

		let stashed = StashedFailure::from(&Error::from(ConfigError::missing("servant")));

		assert!(stashed.vendor.is_none());
	}

	#[test]
	fn outcome_is_tagged_by_status() {
		let outcome = CredentialOutcome::Failure(StashedFailure {
			kind: ErrorKind::IdentityFetch,
			message: "boom".into(),
			vendor: None,
		});
		let value = serde_json::to_value(&outcome).expect("Outcome should serialize.");

		assert_eq!(value["status"], "failure");
		assert_eq!(value["kind"], "identity_fetch");

		let back: CredentialOutcome = serde_json::from_value(value).expect("Outcome should parse.");

		assert_eq!(back, outcome);
	}
}
