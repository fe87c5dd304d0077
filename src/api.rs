//! Typed client for the Servant REST API.
//!
//! Every call appends `access_token` to the query string and treats any status other than `200`
//! as a failure carrying the status and the body exactly as received. [`ServantApi`] also
//! implements [`IdentityFetcher`], the single call the login handler makes after a successful
//! token exchange.

pub mod model;

pub use model::*;

// crates.io
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{ServantId, TokenSecret},
	error::{ConfigError, VendorFailure, VendorPayload},
	obs::{self, FlowKind, FlowMeter, FlowSpan},
	provider::ServantEndpoints,
};

/// Boxed future returned by [`IdentityFetcher`] implementations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Archetype that only accepts multipart uploads.
pub const IMAGE_ARCHETYPE: &str = "image";

/// Retrieves the authenticated user and their servants with one vendor call.
pub trait IdentityFetcher
where
	Self: Send + Sync,
{
	/// Fetches the identity behind `access_token`.
	///
	/// Every failure is reported as [`Error::IdentityFetch`].
	fn fetch_identity<'a>(&'a self, access_token: &'a TokenSecret) -> ApiFuture<'a, Identity>;
}

/// Servant REST API client.
#[derive(Clone, Debug)]
pub struct ServantApi {
	http: ReqwestClient,
	endpoints: ServantEndpoints,
	schemas: Arc<RwLock<HashMap<String, JsonValue>>>,
}
impl ServantApi {
	/// Creates a client with its own reqwest transport.
	pub fn new(endpoints: ServantEndpoints) -> Result<Self> {
		let http = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Ok(Self::with_client(http, endpoints))
	}

	/// Creates a client reusing an existing reqwest client.
	pub fn with_client(http: ReqwestClient, endpoints: ServantEndpoints) -> Self {
		Self { http, endpoints, schemas: Default::default() }
	}

	/// Endpoint set the client talks to.
	pub fn endpoints(&self) -> &ServantEndpoints {
		&self.endpoints
	}

	/// `GET /data/servants`: the user and the servants that granted access.
	pub async fn user_and_servants(&self, token: &TokenSecret) -> Result<UserAndServants> {
		let url = self.url(token, &["data", "servants"]);

		self.call("user_and_servants", self.http.get(url)).await
	}

	/// `GET /data/servants/{servant}`.
	pub async fn show_servant(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
	) -> Result<ServantRef> {
		let url = self.url(token, &["data", "servants", servant.as_str()]);

		self.call("show_servant", self.http.get(url)).await
	}

	/// `GET /data/archetypes/{archetype}`: the archetype's JSON schema, cached per client.
	pub async fn archetype_schema(
		&self,
		token: &TokenSecret,
		archetype: &str,
	) -> Result<JsonValue> {
		require_segment("archetype_schema", "archetype", archetype)?;

		if let Some(schema) = self.schemas.read().get(archetype) {
			return Ok(schema.clone());
		}

		let url = self.url(token, &["data", "archetypes", archetype]);
		let schema: JsonValue = self.call("archetype_schema", self.http.get(url)).await?;

		self.schemas.write().insert(archetype.to_owned(), schema.clone());

		Ok(schema)
	}

	/// Drops every cached archetype schema.
	pub fn clear_schema_cache(&self) {
		self.schemas.write().clear();
	}

	/// Creates (`POST`) or updates (`PUT`, when the record carries a non-empty `_id`) a record.
	pub async fn save_archetype(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		archetype: &str,
		record: &JsonValue,
	) -> Result<JsonValue> {
		const OPERATION: &str = "save_archetype";

		require_segment(OPERATION, "archetype", archetype)?;

		if archetype == IMAGE_ARCHETYPE {
			return Err(Error::InvalidArgument {
				operation: OPERATION,
				reason: "image records must be uploaded, not saved as JSON".into(),
			});
		}

		let Some(fields) = record.as_object() else {
			return Err(Error::InvalidArgument {
				operation: OPERATION,
				reason: "record must be a JSON object".into(),
			});
		};
		let existing = fields.get("_id").and_then(JsonValue::as_str).filter(|id| !id.is_empty());
		let request = match existing {
			Some(id) => {
				require_segment(OPERATION, "record id", id)?;

				let url = self.url(token, &record_path(servant, archetype, id));

				self.http.request(Method::PUT, url)
			},
			None => {
				let url = self.url(token, &archetype_path(servant, archetype));

				self.http.request(Method::POST, url)
			},
		};

		self.call(OPERATION, request.json(record)).await
	}

	/// `GET /data/servants/{servant}/archetypes/{archetype}/{id}`.
	pub async fn show_archetype(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		archetype: &str,
		id: &str,
	) -> Result<JsonValue> {
		require_segment("show_archetype", "archetype", archetype)?;
		require_segment("show_archetype", "record id", id)?;

		let url = self.url(token, &record_path(servant, archetype, id));

		self.call("show_archetype", self.http.get(url)).await
	}

	/// `DELETE /data/servants/{servant}/archetypes/{archetype}/{id}`.
	pub async fn delete_archetype(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		archetype: &str,
		id: &str,
	) -> Result<JsonValue> {
		require_segment("delete_archetype", "archetype", archetype)?;
		require_segment("delete_archetype", "record id", id)?;

		let url = self.url(token, &record_path(servant, archetype, id));

		self.call("delete_archetype", self.http.delete(url)).await
	}

	/// Queries records of an archetype, optionally filtered by `criteria`.
	pub async fn query_archetypes(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		archetype: &str,
		criteria: Option<&ArchetypeCriteria>,
	) -> Result<JsonValue> {
		require_segment("query_archetypes", "archetype", archetype)?;

		let mut url = self.url(token, &archetype_path(servant, archetype));

		if let Some(criteria) = criteria {
			let encoded = serde_json::to_string(criteria).map_err(|e| Error::InvalidArgument {
				operation: "query_archetypes",
				reason: format!("criteria could not be encoded: {e}"),
			})?;

			url.query_pairs_mut().append_pair("criteria", &encoded);
		}

		self.call("query_archetypes", self.http.get(url)).await
	}

	/// Newest records first; `page` defaults to 1.
	pub async fn archetypes_recent(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		archetype: &str,
		page: Option<u32>,
	) -> Result<JsonValue> {
		let criteria = ArchetypeCriteria::by_created(CreatedOrder::Recent, page);

		self.query_archetypes(token, servant, archetype, Some(&criteria)).await
	}

	/// Oldest records first; `page` defaults to 1.
	pub async fn archetypes_oldest(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		archetype: &str,
		page: Option<u32>,
	) -> Result<JsonValue> {
		let criteria = ArchetypeCriteria::by_created(CreatedOrder::Oldest, page);

		self.query_archetypes(token, servant, archetype, Some(&criteria)).await
	}

	/// `POST /data/servants/{servant}/servant_pay/charge`.
	pub async fn servant_pay_charge(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		charge: &Charge,
	) -> Result<JsonValue> {
		require("servant_pay_charge", "currency", &charge.currency)?;

		let url = self.url(token, &pay_path(servant, "charge"));

		self.call("servant_pay_charge", self.http.post(url).json(charge)).await
	}

	/// `POST /data/servants/{servant}/servant_pay/subscription`.
	pub async fn servant_pay_subscription_create(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		plan_id: &str,
	) -> Result<JsonValue> {
		self.subscription(Method::POST, "servant_pay_subscription_create", token, servant, plan_id)
			.await
	}

	/// `PUT /data/servants/{servant}/servant_pay/subscription`.
	pub async fn servant_pay_subscription_update(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
		plan_id: &str,
	) -> Result<JsonValue> {
		self.subscription(Method::PUT, "servant_pay_subscription_update", token, servant, plan_id)
			.await
	}

	/// `DELETE /data/servants/{servant}/servant_pay/subscription`.
	pub async fn servant_pay_subscription_cancel(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
	) -> Result<JsonValue> {
		let url = self.url(token, &pay_path(servant, "subscription"));

		self.call("servant_pay_subscription_cancel", self.http.delete(url)).await
	}

	/// `DELETE /data/servants/{servant}/servant_pay/customer`.
	pub async fn servant_pay_customer_delete(
		&self,
		token: &TokenSecret,
		servant: &ServantId,
	) -> Result<JsonValue> {
		let url = self.url(token, &pay_path(servant, "customer"));

		self.call("servant_pay_customer_delete", self.http.delete(url)).await
	}

	async fn subscription(
		&self,
		method: Method,
		operation: &'static str,
		token: &TokenSecret,
		servant: &ServantId,
		plan_id: &str,
	) -> Result<JsonValue> {
		require(operation, "plan_id", plan_id)?;

		let url = self.url(token, &pay_path(servant, "subscription"));
		let request = self.http.request(method, url).json(&PlanRequest { plan_id });

		self.call(operation, request).await
	}

	fn url(&self, token: &TokenSecret, segments: &[&str]) -> Url {
		let mut url = self.endpoints.api_url(segments);

		url.query_pairs_mut().append_pair("access_token", token.expose());

		// Servant expects HTTPS callers to repeat the scheme in the query.
		if url.scheme() == "https" {
			url.query_pairs_mut().append_pair("protocol", "https");
		}

		url
	}

	async fn call<T>(&self, stage: &'static str, request: RequestBuilder) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Api;

		let span = FlowSpan::new(KIND, stage);
		let meter = FlowMeter::start(KIND);

		let result = span
			.instrument(async move {
				let payload = execute(request).await.map_err(Error::Api)?;

				parse(&payload).map_err(Error::Api)
			})
			.await;

		obs::finish_flow(meter, stage, &result);

		result
	}
}
impl IdentityFetcher for ServantApi {
	fn fetch_identity<'a>(&'a self, access_token: &'a TokenSecret) -> ApiFuture<'a, Identity> {
		Box::pin(async move {
			let url = self.url(access_token, &["data", "servants"]);
			let payload = execute(self.http.get(url)).await.map_err(Error::IdentityFetch)?;
			let body: UserAndServants = parse(&payload).map_err(Error::IdentityFetch)?;

			Identity::try_from(body).map_err(|reason| {
				Error::IdentityFetch(
					VendorFailure::new(format!("Identity is incomplete: {reason}"))
						.with_status(StatusCode::OK.as_u16())
						.with_response(payload),
				)
			})
		})
	}
}

async fn execute(request: RequestBuilder) -> Result<VendorPayload, VendorFailure> {
	// Transport errors would otherwise print the URL, which carries the access token.
	let response = request
		.send()
		.await
		.map_err(|e| VendorFailure::new(format!("Transport error: {}", e.without_url())))?;
	let status = response.status();
	let body = response.bytes().await.map_err(|e| {
		VendorFailure::new(format!("Failed to read response body: {}", e.without_url()))
			.with_status(status.as_u16())
	})?;
	let payload = VendorPayload::from_bytes(&body);

	if status != StatusCode::OK {
		return Err(VendorFailure::new(vendor_message(&payload, status))
			.with_status(status.as_u16())
			.with_response(payload));
	}

	Ok(payload)
}

fn parse<T>(payload: &VendorPayload) -> Result<T, VendorFailure>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(payload.as_str());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
		VendorFailure::new(format!("Response body is invalid at {}: {}", e.path(), e.inner()))
			.with_status(StatusCode::OK.as_u16())
			.with_response(payload.clone())
	})
}

fn vendor_message(payload: &VendorPayload, status: StatusCode) -> String {
	let json = payload.json();
	let field = |name: &str| {
		json.as_ref()
			.and_then(|value| value.get(name))
			.and_then(JsonValue::as_str)
			.map(str::to_owned)
	};

	field("message")
		.or_else(|| field("error"))
		.unwrap_or_else(|| format!("Servant responded with HTTP {}", status.as_u16()))
}

fn require(operation: &'static str, name: &str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::InvalidArgument { operation, reason: format!("{name} is required") });
	}

	Ok(())
}

/// Like [`require`], for values that become a single URL path segment.
fn require_segment(operation: &'static str, name: &str, value: &str) -> Result<()> {
	require(operation, name, value)?;

	if matches!(value, "." | "..") || value.contains('/') {
		return Err(Error::InvalidArgument {
			operation,
			reason: format!("{name} must be a single path segment"),
		});
	}

	Ok(())
}

fn archetype_path<'a>(servant: &'a ServantId, archetype: &'a str) -> [&'a str; 5] {
	["data", "servants", servant.as_str(), "archetypes", archetype]
}

fn record_path<'a>(servant: &'a ServantId, archetype: &'a str, id: &'a str) -> [&'a str; 6] {
	["data", "servants", servant.as_str(), "archetypes", archetype, id]
}

fn pay_path<'a>(servant: &'a ServantId, resource: &'a str) -> [&'a str; 5] {
	["data", "servants", servant.as_str(), "servant_pay", resource]
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ErrorKind;

	fn api() -> ServantApi {
		ServantApi::with_client(ReqwestClient::new(), ServantEndpoints::production())
	}

	fn token() -> TokenSecret {
		TokenSecret::new("tok 1")
	}

	#[test]
	fn urls_carry_the_access_token() {
		let url = api().url(&token(), &["data", "servants"]);

		assert_eq!(
			url.as_str(),
			"https://api0.servant.co/data/servants?access_token=tok+1&protocol=https"
		);

		let local = ServantEndpoints::builder()
			.development_api(0)
			.expect("Development API URL should parse.")
			.build()
			.expect("Loopback API base should validate.");
		let url = ServantApi::with_client(ReqwestClient::new(), local).url(&token(), &["data"]);

		assert_eq!(url.as_str(), "http://api0.localhost:4000/data?access_token=tok+1");
	}

	#[test]
	fn record_ids_cannot_escape_their_archetype() {
		let servant = ServantId::new("s1").expect("Servant fixture should be valid.");
		let url = api().url(&token(), &record_path(&servant, "product", "a%2Fb"));

		assert_eq!(url.path(), "/data/servants/s1/archetypes/product/a%252Fb");

		for id in ["..", ".", "../../servant_pay/customer", "p1/extra"] {
			let err = require_segment("delete_archetype", "record id", id)
				.expect_err("Traversing ids should be rejected.");

			assert_eq!(err.kind(), ErrorKind::InvalidArgument);
		}

		require_segment("delete_archetype", "record id", "p1.v2")
			.expect("Dotted ids are ordinary segments.");
	}

	#[test]
	fn vendor_message_prefers_message_then_error() {
		let status = StatusCode::BAD_REQUEST;

		assert_eq!(
			vendor_message(
				&VendorPayload::new(r#"{"message":"Bad archetype","error":"x"}"#),
				status,
			),
			"Bad archetype"
		);
		assert_eq!(vendor_message(&VendorPayload::new(r#"{"error":"denied"}"#), status), "denied");
		assert_eq!(
			vendor_message(&VendorPayload::new("<html>"), status),
			"Servant responded with HTTP 400"
		);
	}

	#[tokio::test]
	async fn invalid_arguments_fail_before_any_request() {
		let api = api();
		let servant = ServantId::new("s1").expect("Servant fixture should be valid.");
		let cases = [
			api.save_archetype(&token(), &servant, "", &serde_json::json!({})).await,
			api.save_archetype(&token(), &servant, IMAGE_ARCHETYPE, &serde_json::json!({})).await,
			api.save_archetype(&token(), &servant, "product", &serde_json::json!([1])).await,
			api.servant_pay_charge(&token(), &servant, &Charge::new(500, " ")).await,
			api.servant_pay_subscription_create(&token(), &servant, "").await,
			api.show_archetype(&token(), &servant, "product", "").await,
			api.delete_archetype(&token(), &servant, "product", "../../servant_pay/customer").await,
			api.query_archetypes(&token(), &servant, "..", None).await,
			api.save_archetype(&token(), &servant, "product", &serde_json::json!({ "_id": ".." }))
				.await,
		];

		for result in cases {
			let err = result.expect_err("Invalid arguments should be rejected.");

			assert_eq!(err.kind(), ErrorKind::InvalidArgument);
		}
	}
}
