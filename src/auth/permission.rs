//! Requested permission lists for the authorize URL.

// std
use std::slice::Iter;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Errors emitted when validating permissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PermissionError {
	/// Empty permission entries are not allowed.
	#[error("Permission entries cannot be empty.")]
	Empty,
	/// Permissions cannot contain embedded whitespace characters.
	#[error("Permission contains whitespace: {permission}.")]
	ContainsWhitespace {
		/// The offending permission string.
		permission: String,
	},
}

/// Ordered, duplicate-free list of permissions requested from Servant.
///
/// Unlike an OAuth scope set the request order is kept, because the authorize URL joins the
/// items in the order the caller asked for them.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(Vec<String>);
impl PermissionSet {
	/// Delimiter placed between encoded permissions in the `scope` parameter.
	pub const DELIMITER: char = '+';

	/// Creates a permission list from any iterator, dropping repeated entries.
	pub fn new<I, S>(permissions: I) -> Result<Self, PermissionError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut list: Vec<String> = Vec::new();

		for permission in permissions {
			let owned: String = permission.into();

			if owned.is_empty() {
				return Err(PermissionError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(PermissionError::ContainsWhitespace { permission: owned });
			}
			if !list.contains(&owned) {
				list.push(owned);
			}
		}

		Ok(Self(list))
	}

	/// Number of distinct permissions.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if nothing was requested.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the permission was requested.
	pub fn contains(&self, permission: &str) -> bool {
		self.0.iter().any(|candidate| candidate == permission)
	}

	/// Iterator over permissions in request order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Encodes each permission and joins them with [`Self::DELIMITER`].
	///
	/// Returns `None` when nothing was requested so callers can omit the parameter entirely.
	pub fn encoded(&self) -> Option<String> {
		if self.is_empty() {
			return None;
		}

		let mut buf = String::new();

		for (idx, value) in self.0.iter().enumerate() {
			if idx > 0 {
				buf.push(Self::DELIMITER);
			}

			buf.extend(form_urlencoded::byte_serialize(value.as_bytes()));
		}

		Some(buf)
	}
}
impl Debug for PermissionSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PermissionSet").field(&self.0).finish()
	}
}
impl Display for PermissionSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0.join(" "))
	}
}
impl TryFrom<Vec<String>> for PermissionSet {
	type Error = PermissionError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl<'a> IntoIterator for &'a PermissionSet {
	type IntoIter = PermissionIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		PermissionIter { inner: self.0.iter() }
	}
}
impl FromStr for PermissionSet {
	type Err = PermissionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(PermissionError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for PermissionSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for permission in &self.0 {
			seq.serialize_element(permission)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for PermissionSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		PermissionSet::new(values).map_err(DeError::custom)
	}
}

/// Iterator over permission strings.
pub struct PermissionIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for PermissionIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(String::as_str)
	}
}
