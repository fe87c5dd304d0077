//! Strongly typed identifiers for login services, Servant users, and servants.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! servant_id {
	($(#[$meta:meta])* $name:ident => $kind:literal) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps an identifier.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				Self::try_from(value.as_ref().to_owned())
			}

			/// Returns the identifier as received from Servant.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				check($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", $kind, self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (service, user, servant).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (service, user, servant).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (service, user, servant).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier cannot stand alone as a URL path segment (`/`, `.`, or `..`).
	#[error("{kind} identifier must be a single path segment.")]
	NotPathSegment {
		/// Kind of identifier (service, user, servant).
		kind: &'static str,
	},
}

servant_id! {
	/// Name under which a login service is registered (e.g. `servant`).
	ServiceName => "Service"
}
servant_id! {
	/// Servant user identifier (`user._id`).
	UserId => "User"
}
servant_id! {
	/// Servant sub-account identifier (`servant._id`).
	ServantId => "Servant"
}

impl ServiceName {
	/// Name of the Servant login service.
	pub const SERVANT: &'static str = "servant";

	/// Returns the canonical `servant` service name.
	pub fn servant() -> Self {
		Self(Self::SERVANT.to_owned())
	}
}

fn check(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	// Servant ids are short ObjectId-like strings; anything longer is corrupt input.
	if value.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if matches!(value, "." | "..") || value.contains('/') {
		return Err(IdentifierError::NotPathSegment { kind });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_padding_and_empty_values() {
		assert!(UserId::new(" u1").is_err(), "Leading whitespace must be rejected.");
		assert!(UserId::new("u1 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(ServantId::new("").is_err());

		let user = UserId::new("5521f3b2c0").expect("User fixture should be considered valid.");

		assert_eq!(user.as_str(), "5521f3b2c0");
	}

	#[test]
	fn identifiers_stay_within_one_path_segment() {
		for value in ["..", ".", "s1/archetypes", "../s2"] {
			assert_eq!(
				ServantId::new(value),
				Err(IdentifierError::NotPathSegment { kind: "Servant" }),
				"{value} should be rejected."
			);
		}

		assert!(ServantId::new("s1.v2").is_ok());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let user: UserId =
			serde_json::from_str("\"u1\"").expect("User identifier should deserialize.");

		assert_eq!(&*user, "u1");
		assert!(serde_json::from_str::<UserId>("\"\"").is_err());
		assert!(serde_json::from_str::<ServantId>("\"with space\"").is_err());
	}

	#[test]
	fn servant_service_name_is_canonical() {
		assert_eq!(ServiceName::servant().as_str(), "servant");
		assert_eq!(format!("{:?}", ServiceName::servant()), "Service(servant)");

		let too_long = "a".repeat(IDENTIFIER_MAX_LEN + 1);

		assert!(ServiceName::new(&too_long).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ServiceName, u8> = HashMap::from_iter([(ServiceName::servant(), 2_u8)]);

		assert_eq!(map.get("servant"), Some(&2));
	}
}
