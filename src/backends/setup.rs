//! Backend connection setup

use bb8_redis::{bb8::Pool, RedisConnectionManager};

use crate::conf::Conf;
use crate::setup;

/// Build the redis connection url for this config, identical to the one
/// used to build the connection pool
fn redis_url(config: &Conf) -> String {
    let redis = &config.redis;
    match (&redis.username, &redis.password) {
        (Some(user), Some(password)) => {
            format!("redis://{user}:{password}@{}:{}/", redis.host, redis.port)
        }
        (None, Some(password)) => {
            format!("redis://default:{password}@{}:{}/", redis.host, redis.port)
        }
        (None, None) => format!("redis://{}:{}/", redis.host, redis.port),
        (Some(_), None) => panic!("Redis setup error - password must be set if username is set"),
    }
}

/// Build a standalone (non-pooled) redis client, used for the long-lived
/// pub/sub subscription the readiness subsystem holds open
///
/// # Panics
///
/// This will panic if the redis url cannot be parsed
pub fn redis_client(config: &Conf) -> redis::Client {
    redis::Client::open(redis_url(config)).expect("Failed to build redis pub/sub client")
}

/// Set up a connection pool to the redis backend
///
/// # Arguments
///
/// * `config` - The QRM config
///
/// # Panics
///
/// This will panic if we fail to connect to redis
pub async fn redis(config: &Conf) -> Pool<RedisConnectionManager> {
    let redis = &config.redis;
    let url = redis_url(config);
    setup!(
        config.qrm.tracing.local.level,
        format!("Connecting to redis at {}:{}", redis.host, redis.port)
    );
    let manager = RedisConnectionManager::new(url).unwrap_or_else(|e| panic!("{e}"));
    let pool = Pool::builder()
        .max_size(redis.pool_size)
        .build(manager)
        .await
        .expect("Failed to build redis connection pool");
    setup!(config.qrm.tracing.local.level, "Connected to redis");
    pool
}
