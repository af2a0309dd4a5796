//! Shared objects between all requests

use axum::extract::FromRef;
use bb8_redis::{bb8::Pool, RedisConnectionManager};
use std::sync::Arc;
use std::time::Instant;

use crate::backends;
use crate::conf::Conf;
use crate::engine::Engine;
use crate::{error, setup};

/// Tries to execute a future 10 times with a custom timeout
///
/// # Arguments
///
/// * `future` - The future to try to complete
/// * `timeout` - How long to wait for each attempt to complete
/// * `name` - A human readable name for this future, used in log lines
/// * `config` - The QRM config, used to gate log verbosity
macro_rules! retry {
    ($future:expr, $timeout:expr, $name:expr, $config:expr) => {{
        let mut i = 0;
        loop {
            match tokio::time::timeout(std::time::Duration::from_secs($timeout), $future).await {
                Ok(res) => break res,
                Err(err) => {
                    error!(
                        $config.qrm.tracing.local.level,
                        format!(
                            "Future {} failed to complete in {} seconds. Restarting!",
                            $name, $timeout
                        )
                    );
                    if i == 9 {
                        panic!("{:#?}", err)
                    } else {
                        i += 1;
                        continue;
                    }
                }
            }
        }
    }};
}

/// Objects shared between all requests
pub struct Shared {
    /// The QRM config
    pub config: Conf,
    /// A connection pool for redis, the Resource Store's backend
    pub redis: Pool<RedisConnectionManager>,
    /// The allocation engine, rebuilt from the store on startup
    pub engine: Engine,
    /// When this instance started, for the `/uptime` route
    pub started: Instant,
}

impl Shared {
    /// Sets up the shared object and connects to redis. The allocation
    /// engine itself starts empty; call [`Engine::recover`] once this
    /// `Shared` is wrapped in an `Arc` to resurrect in-flight requests.
    ///
    /// # Arguments
    ///
    /// * `config` - The QRM config to use
    pub async fn new(config: Conf) -> Self {
        setup!(
            config.qrm.tracing.local.level,
            format!("Using namespace {}", config.qrm.namespace)
        );
        let redis = retry!(backends::setup::redis(&config), 2, "Redis setup", config);
        Shared {
            config,
            redis,
            engine: Engine::new(),
            started: Instant::now(),
        }
    }
}

/// All of the global states threaded through Axum handlers
#[derive(Clone)]
pub struct AppState {
    /// The objects shared between all requests
    pub shared: Arc<Shared>,
}

impl AppState {
    /// Wrap a [`Shared`] in an [`AppState`]
    pub fn new(shared: Shared) -> Self {
        AppState {
            shared: Arc::new(shared),
        }
    }
}

impl FromRef<AppState> for Arc<Shared> {
    fn from_ref(state: &AppState) -> Self {
        state.shared.clone()
    }
}
