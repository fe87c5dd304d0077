//! Auth-domain identifiers, permission sets, credential correlation values, and secrets.

pub mod credential;
pub mod id;
pub mod permission;
pub mod sealed;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use permission::*;
pub use sealed::*;
pub use secret::*;
