//! Transport primitives for calls to the Servant token endpoint.
//!
//! [`TokenHttpClient`] is the only dependency the token exchanger has on an HTTP stack. Each
//! exchange hands the transport a fresh [`ResponseMetadataSlot`]; the transport records the status
//! and the raw body of whatever the endpoint answered so a failed exchange can carry the vendor
//! payload unchanged even after `oauth2` has parsed (or failed to parse) it.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::VendorPayload};

/// HTTP transport the token exchanger runs on.
///
/// One transport is shared by every login attempt; each attempt asks it for a handle bound to that
/// attempt's [`ResponseMetadataSlot`].
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Error raised by the transport itself (connection, TLS, body read).
	type TransportError: 'static + Send + Sync + StdError;

	/// Handle passed to `oauth2` for a single exchange.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Binds a handle to `slot`.
	///
	/// The handle clears the slot before sending and stores the status and the raw body of any
	/// response it receives, success or not.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// What the token endpoint answered.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code.
	pub status: Option<u16>,
	/// Raw response body, exactly as received.
	pub body: Option<VendorPayload>,
}

/// Shared cell the transport writes [`ResponseMetadata`] into and the exchanger reads back.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Replaces the stored metadata.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Removes and returns the stored metadata.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest transport for token exchanges.
///
/// The token endpoint answers directly, so a custom client passed in should not follow
/// redirects.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = CapturingHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		CapturingHandle { client: self.0.clone(), slot }
	}
}

/// Per-exchange handle that copies the token endpoint's answer into its slot.
#[derive(Clone, Debug)]
pub struct CapturingHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for CapturingHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let request = reqwest::Request::try_from(request).map_err(Box::new)?;
			let response = self.client.execute(request).await.map_err(Box::new)?;
			let mut captured = HttpResponse::new(Vec::new());

			*captured.status_mut() = response.status();
			*captured.headers_mut() = response.headers().clone();

			let body = response.bytes().await.map_err(Box::new)?;

			self.slot.store(ResponseMetadata {
				status: Some(captured.status().as_u16()),
				body: Some(VendorPayload::from_bytes(&body)),
			});
			*captured.body_mut() = body.to_vec();

			Ok(captured)
		})
	}
}
