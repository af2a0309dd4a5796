//! The Queue-based Resource Manager (QRM) service

use std::net::{IpAddr, SocketAddr};

use tower_http::cors::CorsLayer;

use crate::{error, setup};

pub mod backends;
pub mod conf;
pub mod engine;
pub mod models;
mod reaper;
mod routes;
pub mod utils;

pub use conf::Conf;

/// Build the axum app: mounts every route group and attaches tracing/CORS
/// middleware
///
/// # Arguments
///
/// * `state` - The shared application state
/// * `conf` - The QRM config
fn build_app(state: utils::AppState, conf: &Conf) -> axum::Router {
    use axum::http::header::{HeaderName, HeaderValue};
    use axum::http::Method;
    use axum::{http::Request, response::Response};
    use std::time::Duration;
    use tower_http::set_header::SetResponseHeaderLayer;
    use tower_http::trace::{DefaultMakeSpan, TraceLayer};
    use tracing::{event, Level, Span};

    let mut app = axum::Router::new();
    app = routes::basic::mount(app);
    app = routes::user::mount(app);
    app = routes::management::mount(app);
    app = routes::docs::mount(app);

    let cors = if conf.qrm.cors.insecure {
        CorsLayer::permissive()
    } else {
        let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
        let origins = conf
            .qrm
            .cors
            .domains
            .iter()
            .map(|domain| domain.parse())
            .collect::<Result<Vec<HeaderValue>, _>>()
            .expect("Failed to parse CORS domains");
        cors.allow_origin(origins)
    };

    app = app
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(|req: &Request<_>, span: &Span| {
                    let url_and_query = match req.uri().path_and_query() {
                        Some(path_and_query) => path_and_query.as_str(),
                        None => req.uri().path(),
                    };
                    let url = req.uri().path();
                    event!(
                        parent: span,
                        Level::INFO,
                        url = url,
                        uri = url_and_query,
                        msg = "Starting Request"
                    );
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    let code = response.status();
                    event!(
                        parent: span,
                        Level::INFO,
                        code = code.as_u16(),
                        status = code.as_str(),
                        latency = latency.as_millis(),
                        msg = "Responding to Request"
                    );
                }),
        )
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("qrm-version"),
            HeaderValue::from_str(env!("CARGO_PKG_VERSION"))
                .expect("QRM version is not a valid header value"),
        ));
    app.with_state(state)
}

/// Launches QRM using axum
///
/// # Arguments
///
/// * `config` - The QRM config to run with
///
/// # Panics
///
/// Will panic if we cannot connect to redis or bind our listener in 10 attempts.
pub async fn axum(config: Conf) {
    let shared = Box::pin(utils::Shared::new(config.clone())).await;
    let log_level = shared.config.qrm.tracing.local.level;
    setup!(
        log_level,
        format!("binding to {}:{}", &config.qrm.interface, &config.qrm.port)
    );
    utils::trace::setup("QRM", &config.qrm.tracing);
    let state = utils::AppState::new(shared);
    // resurrect any requests that were in-flight when this instance last stopped
    engine::Engine::recover(&state.shared)
        .await
        .unwrap_or_else(|err| panic!("Failed to recover engine state from redis: {err}"));
    if config.qrm.auto_managed_token_reaper.enabled {
        tokio::spawn(reaper::run(state.shared.clone()));
    }
    let app = build_app(state, &config);
    let bind_addr: IpAddr = config
        .qrm
        .interface
        .parse()
        .expect("Failed to parse interface addr");
    let addr = SocketAddr::new(bind_addr, config.qrm.port);
    let mut attempts = 0;
    loop {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .unwrap_or_else(|_| panic!("Failed to bind to {addr}"));
        match axum::serve(listener, app.clone()).await {
            Ok(()) => break,
            Err(error) => {
                error!(log_level, format!("Failed to bind server: {:#?}", error));
            }
        }
        attempts += 1;
        assert!(attempts <= 10, "Failed to bind server in 10 attempts");
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    }
}
