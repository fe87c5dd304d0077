//! Wire and domain models for the Servant REST API.

// self
use crate::{
	_prelude::*,
	auth::{ServantId, UserId},
};

/// Vendor fields kept verbatim next to the typed ones.
pub type ExtraFields = BTreeMap<String, JsonValue>;

/// `user` object returned by `GET /data/servants`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServantUser {
	/// Servant user identifier.
	#[serde(rename = "_id", default)]
	pub id: String,
	/// Primary email address.
	#[serde(default)]
	pub email: String,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub full_name: Option<String>,
	/// Remaining vendor fields.
	#[serde(flatten)]
	pub extra: ExtraFields,
}

/// Servant sub-account visible to the application.
///
/// Only `_id` is interpreted; every other field is preserved so the profile handed to the host
/// matches what Servant returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServantRef {
	/// Servant identifier.
	#[serde(rename = "_id")]
	pub id: String,
	/// Remaining vendor fields.
	#[serde(flatten)]
	pub extra: ExtraFields,
}
impl ServantRef {
	/// Creates a reference holding only an identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self { id: id.into(), extra: ExtraFields::new() }
	}

	/// Returns the validated identifier.
	pub fn servant_id(&self) -> Result<ServantId, crate::auth::IdentifierError> {
		ServantId::new(&self.id)
	}
}

/// Body of `GET /data/servants`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserAndServants {
	/// Authenticated user.
	pub user: ServantUser,
	/// Servants that granted the application access.
	#[serde(default)]
	pub servants: Vec<ServantRef>,
}

/// Normalized identity of the authenticated Servant user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
	/// Servant user identifier (non-empty).
	pub user_id: UserId,
	/// Email address (non-empty).
	pub email: String,
	/// Display name, when Servant reports one.
	pub full_name: Option<String>,
	/// Servants the user granted access to.
	pub servants: Vec<ServantRef>,
}
impl TryFrom<UserAndServants> for Identity {
	type Error = String;

	fn try_from(value: UserAndServants) -> Result<Self, Self::Error> {
		let UserAndServants { user, servants } = value;

		if user.id.is_empty() {
			return Err("user._id is missing".into());
		}
		if user.email.is_empty() {
			return Err("user.email is missing".into());
		}

		let user_id = UserId::new(&user.id).map_err(|e| e.to_string())?;

		Ok(Self { user_id, email: user.email, full_name: user.full_name, servants })
	}
}

/// Sort direction on the `created` field of archetype records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreatedOrder {
	/// Newest records first (`created: -1`).
	Recent,
	/// Oldest records first (`created: 1`).
	Oldest,
}
impl CreatedOrder {
	fn direction(self) -> i8 {
		match self {
			Self::Recent => -1,
			Self::Oldest => 1,
		}
	}
}

/// `criteria` document accepted by the archetype query endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeCriteria {
	/// Mongo-style filter document.
	#[serde(default = "empty_object")]
	pub query: JsonValue,
	/// Sort specification, field name to direction (`1` or `-1`).
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub sort: BTreeMap<String, i8>,
	/// One-based page number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page: Option<u32>,
}
impl ArchetypeCriteria {
	const DEFAULT_PAGE: u32 = 1;

	/// Criteria matching every record.
	pub fn all() -> Self {
		Self { query: empty_object(), sort: BTreeMap::new(), page: None }
	}

	/// Criteria listing every record ordered by creation time.
	pub fn by_created(order: CreatedOrder, page: Option<u32>) -> Self {
		let mut criteria = Self::all();

		criteria.sort.insert("created".into(), order.direction());
		criteria.page = Some(page.unwrap_or(Self::DEFAULT_PAGE));

		criteria
	}

	/// Replaces the filter document.
	pub fn with_query(mut self, query: JsonValue) -> Self {
		self.query = query;

		self
	}
}
impl Default for ArchetypeCriteria {
	fn default() -> Self {
		Self::all()
	}
}

/// Servant Pay charge request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
	/// Total amount in cents.
	pub amount: u64,
	/// ISO currency code.
	pub currency: String,
}
impl Charge {
	/// Creates a charge for `amount` cents.
	pub fn new(amount: u64, currency: impl Into<String>) -> Self {
		Self { amount, currency: currency.into() }
	}
}

#[derive(Debug, Serialize)]
pub(crate) struct PlanRequest<'a> {
	pub(crate) plan_id: &'a str,
}

fn empty_object() -> JsonValue {
	JsonValue::Object(Default::default())
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn servants_keep_unknown_fields() {
		let body = json!({
			"user": { "_id": "u1", "email": "a@b.com", "full_name": "A B" },
			"servants": [{ "_id": "s1", "master": "u1", "plan": "free" }]
		});
		let parsed: UserAndServants =
			serde_json::from_value(body.clone()).expect("Body should deserialize.");

		assert_eq!(parsed.servants[0].id, "s1");
		assert_eq!(
			serde_json::to_value(&parsed.servants).expect("Servants should serialize."),
			body["servants"]
		);
	}

	#[test]
	fn identity_requires_id_and_email() {
		let body = json!({ "user": { "_id": "u1", "email": "" }, "servants": [] });
		let parsed: UserAndServants =
			serde_json::from_value(body).expect("Body should deserialize.");

		assert!(Identity::try_from(parsed).is_err());

		let body = json!({ "user": { "email": "a@b.com" } });
		let parsed: UserAndServants =
			serde_json::from_value(body).expect("Body should deserialize.");

		assert!(Identity::try_from(parsed).is_err());
	}

	#[test]
	fn created_order_criteria_match_sdk_shape() {
		let recent = ArchetypeCriteria::by_created(CreatedOrder::Recent, None);

		assert_eq!(
			serde_json::to_value(&recent).expect("Criteria should serialize."),
			json!({ "query": {}, "sort": { "created": -1 }, "page": 1 })
		);

		let oldest = ArchetypeCriteria::by_created(CreatedOrder::Oldest, Some(3));

		assert_eq!(
			serde_json::to_value(&oldest).expect("Criteria should serialize."),
			json!({ "query": {}, "sort": { "created": 1 }, "page": 3 })
		);
	}
}
