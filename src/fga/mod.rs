//! Authorization store integration.
//!
//! Group membership facts are mirrored into a relationship-based
//! authorization store (OpenFGA) as `(user, member, group:<id>)` tuples so
//! downstream services can answer membership checks. [`client::Authorizer`]
//! is the seam the provisioning engine depends on; [`client::OpenFgaClient`]
//! is the HTTP implementation.

pub mod client;
pub mod error;
pub mod types;

pub use client::{Authorizer, OpenFgaClient};
pub use error::{FgaError, FgaResult};
pub use types::{GROUP_OBJECT_KIND, MEMBER_RELATION, TupleKey, group_object};
