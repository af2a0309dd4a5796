//! Shared test harness: every test gets its own redis key namespace so
//! concurrent test binaries never collide on the same store.

use qrm::conf::{Conf, Qrm, Redis};
use qrm::models::{Resource, ResourceStatus};
use qrm::utils::Shared;

/// Build a [`Shared`] pointed at the redis instance named by
/// `QRM_TEST_REDIS_HOST`/`QRM_TEST_REDIS_PORT` (default `localhost:6379`),
/// under a namespace unique to this test run
pub async fn shared(namespace: &str) -> Shared {
    let host = std::env::var("QRM_TEST_REDIS_HOST").unwrap_or_else(|_| "localhost".to_owned());
    let port = std::env::var("QRM_TEST_REDIS_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(6379);
    let conf = Conf {
        qrm: Qrm {
            namespace: format!("qrm-test-{namespace}-{}", uuid::Uuid::new_v4()),
            ..Qrm::default()
        },
        redis: Redis {
            host,
            port,
            pool_size: 5,
            username: None,
            password: None,
        },
    };
    Shared::new(conf).await
}

/// Add `count` fresh `Active` resources named `r1..rN` of type `server`,
/// returning their names
pub async fn seed_resources(shared: &Shared, count: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(count);
    for i in 1..=count {
        let name = format!("r{i}");
        let resource = Resource::new(&name, "server");
        qrm::backends::resources::add(&resource, shared)
            .await
            .expect("failed to add resource");
        names.push(name);
    }
    names
}

/// Tag an existing resource
pub async fn tag(shared: &Shared, name: &str, tag: &str) {
    qrm::backends::tags::add_tag_to_resource(name, tag, shared)
        .await
        .expect("failed to tag resource");
}

#[allow(dead_code)]
pub fn resource_status_is(resource: &Resource, status: ResourceStatus) -> bool {
    resource.status == status
}

/// Poll `get_resource_req_resp` until `request_complete` is set or `tries`
/// polls (100ms apart) elapse; the names-worker that fills a request runs
/// as a detached background task so callers must observe completion
/// rather than assume it
pub async fn wait_for_completion(
    shared: &Shared,
    token: &str,
    tries: usize,
) -> qrm::models::ResourcesRequestResponse {
    for _ in 0..tries {
        let response = qrm::engine::Engine::get_resource_req_resp(shared, token)
            .await
            .expect("failed to poll token status");
        if response.request_complete {
            return response;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("token {token} did not complete within {tries} polls");
}
