//! SCIM 2.0 protocol implementation.
//!
//! Types and parsers for the subset of SCIM 2.0 (RFC 7643/7644) this bridge
//! speaks with identity providers:
//!
//! - [`types`]: resource payloads, response envelopes, pagination
//! - [`error`]: RFC 7644 error responses
//! - [`filter`]: single-clause filter expression parser
//! - [`patch`]: PATCH operation parser

pub mod error;
pub mod filter;
pub mod patch;
pub mod types;

pub use error::{ScimError, ScimErrorType};
pub use filter::{Filter, FilterError, FilterField, FilterOperator, parse_filter};
pub use patch::{
    GroupPatchAction, GroupPatchOp, GroupPatchRequest, PatchError, UserPatchOp, UserPatchRequest,
};
pub use types::*;
