//! Login flows: the server-side handler, pending-credential hand-off, the login-service
//! registry, and the client-side initiator.

pub mod common;
pub mod credential;
pub mod initiate;
pub mod login;
pub mod registry;

pub use common::*;
pub use credential::*;
pub use initiate::*;
pub use login::*;
pub use registry::*;
