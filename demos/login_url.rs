//! Builds the Servant authorize URL for a popup login and shows how the callback side stashes and
//! hands out the outcome.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use servant_login::{
	auth::{AesGcmSealer, PermissionSet},
	config::ProviderConfig,
	flows::{CredentialRequestOptions, LaunchRequest, LoginInitiator, LoginLauncher},
};

struct PrintingLauncher;
impl LoginLauncher for PrintingLauncher {
	fn launch(&self, request: LaunchRequest) -> servant_login::error::Result<()> {
		println!(
			"Open a {}x{} {} window for `{}` at {}.",
			request.popup_options.width,
			request.popup_options.height,
			request.login_style,
			request.login_service,
			request.login_url
		);

		Ok(())
	}
}

fn main() -> Result<()> {
	color_eyre::install()?;

	let sealer = AesGcmSealer::from_hex(&AesGcmSealer::generate_key())?;
	let config = ProviderConfig::new("demo-client", "demo-secret").seal_secret(&sealer)?;
	let initiator = LoginInitiator::new(Arc::new(PrintingLauncher));
	let options = CredentialRequestOptions {
		request_permissions: PermissionSet::new(["read:user", "write:archetypes"])?,
		..Default::default()
	};
	let token = initiator.request_credential(Some(&config), &options)?;

	println!("Poll for the outcome under credential token {}.", token.as_str());
	println!("The callback handler calls LoginService::complete with the returned code and state.");

	Ok(())
}
