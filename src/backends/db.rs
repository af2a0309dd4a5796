//! Connection and (de)serialization helpers shared by every backend module

use bb8_redis::{bb8, RedisConnectionManager};

use crate::backends::keys::Keys;
use crate::unavailable;
use crate::utils::{ApiError, Shared};

/// Build the namespaced key set for this instance's configured namespace
pub fn keys(shared: &Shared) -> Keys {
    Keys::new(&shared.config.qrm.namespace)
}

/// Build the namespaced key set directly from a namespace, for callers
/// (like the readiness subscriber) that only hold the config, not a
/// [`Shared`]
pub fn keys_from_namespace(namespace: &str) -> Keys {
    Keys::new(namespace)
}

/// Gets a connection from the redis connection pool
#[doc(hidden)]
#[macro_export]
macro_rules! conn {
    ($shared:expr) => {
        &mut *$crate::backends::db::get_conn($shared).await?
    };
}

/// Perform a non pipelined query against redis
#[doc(hidden)]
#[macro_export]
macro_rules! query {
    ($cmd:expr, $shared:expr) => {
        $cmd.query_async($crate::conn!($shared))
    };
}

/// Serialize a value to JSON for storage in redis, mapping failures to an
/// [`ApiError`]
#[doc(hidden)]
#[macro_export]
macro_rules! serialize {
    ($value:expr) => {
        serde_json::to_string($value)?
    };
}

/// Deserialize a JSON string read back from redis
#[doc(hidden)]
#[macro_export]
macro_rules! deserialize {
    ($value:expr) => {
        serde_json::from_str($value)?
    };
}

/// Gets a connection from the redis connection pool
///
/// # Arguments
///
/// * `shared` - The objects shared across all requests
pub async fn get_conn(
    shared: &Shared,
) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, ApiError> {
    match shared.redis.get().await {
        Ok(conn) => Ok(conn),
        Err(error) => unavailable!(format!("Failed to get connection from pool: {error:#?}")),
    }
}
