//! Host-side registry of login services, keyed by service name.

// self
use crate::{
	_prelude::*,
	auth::ServiceName,
	error::ConfigError,
	flows::{AuthorizationQuery, LoginResult, LoginService},
};

/// Boxed future returned by [`LoginHandler::handle_query`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<LoginResult>> + 'a + Send>>;

/// Handler invoked for an incoming OAuth callback.
pub trait LoginHandler
where
	Self: Send + Sync,
{
	/// Runs one login attempt.
	fn handle_query<'a>(&'a self, query: &'a AuthorizationQuery) -> HandlerFuture<'a>;
}
impl LoginHandler for LoginService {
	fn handle_query<'a>(&'a self, query: &'a AuthorizationQuery) -> HandlerFuture<'a> {
		Box::pin(self.handle(query))
	}
}

/// One registered login service.
#[derive(Clone)]
pub struct RegisteredService {
	/// Service name.
	pub name: ServiceName,
	/// OAuth protocol version tag.
	pub version: u8,
	/// URL of an OAuth 1 request-token endpoint, unused for OAuth 2 services.
	pub url: Option<Url>,
	handler: Arc<dyn LoginHandler>,
}
impl RegisteredService {
	/// Handler registered under the name.
	pub fn handler(&self) -> &Arc<dyn LoginHandler> {
		&self.handler
	}
}
impl Debug for RegisteredService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisteredService")
			.field("name", &self.name)
			.field("version", &self.version)
			.field("url", &self.url)
			.finish()
	}
}

/// Login-service registry: `register(name, version, url, handler)` plus dispatch by name.
#[derive(Debug, Default)]
pub struct LoginServiceRegistry {
	services: HashMap<ServiceName, RegisteredService>,
}
impl LoginServiceRegistry {
	/// Version tag of OAuth 2 services.
	pub const OAUTH2: u8 = 2;

	/// Registers a handler; names must be unique.
	pub fn register(
		&mut self,
		name: ServiceName,
		version: u8,
		url: Option<Url>,
		handler: Arc<dyn LoginHandler>,
	) -> Result<()> {
		if self.services.contains_key(&name) {
			return Err(ConfigError::DuplicateService { service: name.to_string() }.into());
		}

		self.services.insert(name.clone(), RegisteredService { name, version, url, handler });

		Ok(())
	}

	/// Registers the Servant handler under `config.service` as an OAuth 2 service.
	pub fn register_servant(&mut self, service: LoginService) -> Result<()> {
		let name = service.config.service.clone();

		self.register(name, Self::OAUTH2, None, Arc::new(service))
	}

	/// Looks up a registered service.
	pub fn get(&self, name: &str) -> Option<&RegisteredService> {
		self.services.get(name)
	}

	/// Iterates over registered service names.
	pub fn names(&self) -> impl Iterator<Item = &ServiceName> {
		self.services.keys()
	}

	/// Runs the handler registered under `name`.
	pub async fn dispatch(&self, name: &str, query: &AuthorizationQuery) -> Result<LoginResult> {
		let service = self
			.get(name)
			.ok_or_else(|| ConfigError::UnknownService { service: name.to_owned() })?;

		service.handler.handle_query(query).await
	}
}
