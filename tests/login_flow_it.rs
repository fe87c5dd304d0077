mod common;

// crates.io
use httpmock::prelude::*;
// self
use common::*;
use servant_login::{
	api::ServantRef,
	auth::SecretSealer,
	error::ErrorKind,
	flows::{AuthorizationQuery, LoginService, Profile},
};

const TOKEN_PATH: &str = "/connect/oauth2/token";
const IDENTITY_BODY: &str =
	r#"{"user":{"_id":"u1","email":"a@b.com","full_name":"A B"},"servants":[{"_id":"s1"}]}"#;

#[tokio::test]
async fn code_grant_produces_sealed_service_data_and_profile() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=authorization_code")
				.body_includes("code=xyz")
				.body_includes("client_id=abc")
				.body_includes("client_secret=shh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\"}");
		})
		.await;
	let identity_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/data/servants").query_param("access_token", "tok1");
			then.status(200).header("content-type", "application/json").body(IDENTITY_BODY);
		})
		.await;
	let service = mock_login_service(&server);
	let login = service
		.handle(&AuthorizationQuery::code("xyz"))
		.await
		.expect("Login should succeed against the mock server.");

	token_mock.assert_async().await;
	identity_mock.assert_async().await;

	let service_data = &login.service_data;

	assert_eq!(service_data.id.to_string(), "u1");
	assert_eq!(service_data.email, "a@b.com");
	assert_ne!(service_data.access_token.data, "tok1");
	assert_eq!(service_data.access_token.algorithm, "aes-256-gcm");
	assert_eq!(
		sealer()
			.open(&service_data.access_token)
			.expect("Sealed token should open with the same key.")
			.expose(),
		"tok1"
	);

	assert_eq!(
		login.options.profile,
		Profile { name: Some("A B".into()), servants: vec![ServantRef::new("s1")] }
	);

	let json = serde_json::to_value(&login).expect("Login result should serialize.");

	assert_eq!(json["serviceData"]["id"], "u1");
	assert_eq!(json["serviceData"]["email"], "a@b.com");
	assert!(json["serviceData"]["accessToken"]["authTag"].is_string());
	assert_eq!(
		json["options"]["profile"],
		serde_json::json!({ "name": "A B", "servants": [{ "_id": "s1" }] })
	);
}

#[tokio::test]
async fn rejected_code_keeps_vendor_body_and_skips_identity_fetch() {
	const BODY: &str = "{\"error\":\"invalid_grant\",\"error_description\":\"Code already used\"}";

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400).header("content-type", "application/json").body(BODY);
		})
		.await;
	let identity_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/data/servants");
			then.status(200).header("content-type", "application/json").body(IDENTITY_BODY);
		})
		.await;
	let service = mock_login_service(&server);
	let err = service
		.handle(&AuthorizationQuery::code("xyz"))
		.await
		.expect_err("A reused code should be rejected.");

	token_mock.assert_async().await;
	identity_mock.assert_calls_async(0).await;

	assert_eq!(err.kind(), ErrorKind::OAuthHandshake);

	let failure = err.vendor_failure().expect("Handshake failures should carry vendor details.");

	assert_eq!(failure.status, Some(400));
	assert_eq!(failure.message, "invalid_grant: Code already used");
	assert_eq!(err.vendor_response().map(|body| body.as_str()), Some(BODY));
}

#[tokio::test]
async fn identity_failure_surfaces_as_identity_fetch() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\",\"token_type\":\"bearer\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/data/servants");
			then.status(503)
				.header("content-type", "application/json")
				.body("{\"message\":\"down\"}");
		})
		.await;

	let service = mock_login_service(&server);
	let err = service
		.handle(&AuthorizationQuery::code("xyz"))
		.await
		.expect_err("Identity failures should fail the login.");

	assert_eq!(err.kind(), ErrorKind::IdentityFetch);

	let failure = err.vendor_failure().expect("Identity failures should carry vendor details.");

	assert_eq!(failure.status, Some(503));
	assert_eq!(failure.message, "down");
	assert!(!err.to_string().contains("tok1"));
}

#[tokio::test]
async fn incomplete_identity_is_rejected() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/data/servants");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"user\":{\"_id\":\"u1\"},\"servants\":[]}");
		})
		.await;

	let service = mock_login_service(&server);
	let err = service
		.handle(&AuthorizationQuery::code("xyz"))
		.await
		.expect_err("An identity without email should fail the login.");

	assert_eq!(err.kind(), ErrorKind::IdentityFetch);
	assert!(err.to_string().contains("user.email"));
}

#[tokio::test]
async fn refresh_grant_logs_in_without_a_code() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=r1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\",\"refresh_token\":\"r2\",\"expires_in\":3600}");
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/data/servants").query_param("access_token", "tok1");
			then.status(200).header("content-type", "application/json").body(IDENTITY_BODY);
		})
		.await;

	let service = mock_login_service(&server);
	let login = service
		.handle(&AuthorizationQuery::refresh_token("r1"))
		.await
		.expect("Refresh login should succeed.");

	token_mock.assert_async().await;

	assert_eq!(login.service_data.email, "a@b.com");
}

#[tokio::test]
async fn invalid_query_never_reaches_servant() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let service = mock_login_service(&server);
	let both = AuthorizationQuery {
		code: Some("xyz".into()),
		refresh_token: Some("r1".into()),
		state: None,
	};

	for query in [AuthorizationQuery::default(), AuthorizationQuery::code(""), both] {
		let err = service.handle(&query).await.expect_err("Unusable queries should be rejected.");

		assert_eq!(err.kind(), ErrorKind::InvalidQuery);
	}

	token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn sync_servants_uses_the_sealed_token() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\"}");
		})
		.await;

	let identity_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/data/servants").query_param("access_token", "tok1");
			then.status(200).header("content-type", "application/json").body(IDENTITY_BODY);
		})
		.await;
	let service: LoginService = mock_login_service(&server);
	let login = service
		.handle(&AuthorizationQuery::code("xyz"))
		.await
		.expect("Login should succeed against the mock server.");
	let servants = service
		.sync_servants(&login.service_data)
		.await
		.expect("Servant sync should succeed.");

	identity_mock.assert_calls_async(2).await;

	assert_eq!(servants, login.options.profile.servants);
}
