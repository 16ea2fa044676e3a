//! Data model, input schema and error contract for the API-gateway
//! configuration translation core.
//!
//! This crate holds no parsing or build logic — it is the contract layer
//! consumed by `gwxlate-core`'s translation pipeline, the same way
//! `mofa-kernel::gateway` holds trait/data contracts consumed by
//! `mofa-gateway`'s concrete implementations.
//!
//! # Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`descriptor`] | the declarative `ServiceDescription` input schema |
//! | [`options`] | builder `Options` |
//! | [`model`] | `ServiceModel`, `Method`, `UriTemplate`, `BackendCluster`, `AuthProvider` |
//! | [`error`] | `BuildError` and its `ErrorKind` taxonomy |
//! | [`openid`] | the OpenID-discovery collaborator trait |

pub mod descriptor;
pub mod error;
pub mod model;
pub mod openid;
pub mod options;

pub use error::{BuildError, BuildResult, ErrorKind};
pub use options::Options;
