//! Crate version info returned by the ambient `/api/version` route

use serde::Serialize;
use utoipa::ToSchema;

/// The running QRM build's version
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct Version {
    /// The crate version, from `CARGO_PKG_VERSION`
    pub version: String,
}

impl Default for Version {
    fn default() -> Self {
        Version {
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}
