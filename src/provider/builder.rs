//! Builder and validation rules for [`ServantEndpoints`].

// self
use crate::{_prelude::*, provider::ServantEndpoints};

/// Errors raised while constructing or validating endpoint sets.
#[derive(Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum EndpointsError {
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoints must be absolute HTTP(S) URLs with a host.
	#[error("The {endpoint} endpoint is not a hierarchical URL: {url}.")]
	NotHierarchical {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ServantEndpoints`]; unset endpoints fall back to production values.
#[derive(Debug, Default)]
pub struct ServantEndpointsBuilder {
	/// Override for the authorize endpoint.
	pub authorization: Option<Url>,
	/// Override for the token endpoint.
	pub token: Option<Url>,
	/// Override for the API base.
	pub api: Option<Url>,
}
impl ServantEndpointsBuilder {
	/// Sets the authorize endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token = Some(url);

		self
	}

	/// Sets the API base.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api = Some(url);

		self
	}

	/// Points the API base at a local development server (`http://api<version>.localhost:4000`).
	pub fn development_api(self, version: u8) -> Result<Self, url::ParseError> {
		let url = Url::parse(&format!("http://api{version}.localhost:4000"))?;

		Ok(self.api_base(url))
	}

	/// Consumes the builder and validates the resulting endpoint set.
	pub fn build(self) -> Result<ServantEndpoints, EndpointsError> {
		let production = ServantEndpoints::production();
		let endpoints = ServantEndpoints {
			authorization: self.authorization.unwrap_or(production.authorization),
			token: self.token.unwrap_or(production.token),
			api: self.api.unwrap_or(production.api),
		};

		endpoints.validate()?;

		Ok(endpoints)
	}
}

impl ServantEndpoints {
	/// Validates invariants for the endpoint set.
	pub fn validate(&self) -> Result<(), EndpointsError> {
		validate_endpoint("authorization", &self.authorization)?;
		validate_endpoint("token", &self.token)?;
		validate_endpoint("api", &self.api)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), EndpointsError> {
	if url.cannot_be_a_base() || url.host_str().is_none() {
		return Err(EndpointsError::NotHierarchical { endpoint: name, url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(EndpointsError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse endpoint fixture.")
	}

	#[test]
	fn builder_defaults_to_production() {
		let endpoints = ServantEndpoints::builder().build().expect("Defaults should validate.");

		assert_eq!(endpoints, ServantEndpoints::production());
	}

	#[test]
	fn insecure_remote_endpoints_are_rejected() {
		let err = ServantEndpoints::builder()
			.token_endpoint(url("http://www.servant.co/connect/oauth2/token"))
			.build()
			.expect_err("Plain HTTP token endpoint should be rejected.");

		assert!(matches!(err, EndpointsError::InsecureEndpoint { endpoint: "token", .. }));
	}

	#[test]
	fn loopback_http_is_allowed_for_development() {
		let endpoints = ServantEndpoints::builder()
			.development_api(0)
			.expect("Development URL should parse.")
			.token_endpoint(url("http://127.0.0.1:8080/token"))
			.build()
			.expect("Loopback endpoints should validate.");

		assert_eq!(endpoints.api.as_str(), "http://api0.localhost:4000/");
	}

	#[test]
	fn non_hierarchical_urls_are_rejected() {
		let err = ServantEndpoints::builder()
			.api_base(url("mailto:api@servant.co"))
			.build()
			.expect_err("Mailto URL should be rejected.");

		assert!(matches!(err, EndpointsError::NotHierarchical { endpoint: "api", .. }));
	}
}
