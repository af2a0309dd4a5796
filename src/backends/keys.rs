//! Centralized redis key naming for the Resource Store.
//!
//! Every key is prefixed with the configured namespace, mirroring the
//! literal key names used by the original store
//! (`all_resources`, `qrm_status`, `resource_name_<name>`, ...).

/// Builds and holds the namespaced redis keys for a single QRM instance
#[derive(Debug, Clone)]
pub struct Keys {
    /// The namespace prefix applied to every key
    namespace: String,
}

impl Keys {
    /// Build a new key builder for a namespace
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Keys {
            namespace: namespace.into(),
        }
    }

    /// The hash of `name -> Resource` JSON for every known resource
    #[must_use]
    pub fn all_resources(&self) -> String {
        format!("{}:all_resources", self.namespace)
    }

    /// The scalar server status (`active`/`pending`/`disabled`)
    #[must_use]
    pub fn qrm_status(&self) -> String {
        format!("{}:qrm_status", self.namespace)
    }

    /// A resource's FIFO job queue
    #[must_use]
    pub fn resource_jobs(&self, name: &str) -> String {
        format!("{}:resource_name_{}", self.namespace, name)
    }

    /// `token -> JSON array of Resource`, written once a request is filled
    #[must_use]
    pub fn token_dict(&self) -> String {
        format!("{}:token_dict", self.namespace)
    }

    /// `seed -> active token`
    #[must_use]
    pub fn active_token_dict(&self) -> String {
        format!("{}:active_token_dict", self.namespace)
    }

    /// `active token -> OpenRequest JSON`
    #[must_use]
    pub fn open_requests(&self) -> String {
        format!("{}:open_requests", self.namespace)
    }

    /// `active token -> OrigRequest JSON`
    #[must_use]
    pub fn orig_requests(&self) -> String {
        format!("{}:orig_requests", self.namespace)
    }

    /// `active token -> JSON array of granted resource names`
    #[must_use]
    pub fn fill_requests(&self) -> String {
        format!("{}:fill_requests", self.namespace)
    }

    /// `active token -> ResourcesRequestResponse JSON`
    #[must_use]
    pub fn last_req_resp(&self) -> String {
        format!("{}:last_req_resp", self.namespace)
    }

    /// `tag -> set of resource names`
    #[must_use]
    pub fn tag_res_name_map(&self, tag: &str) -> String {
        format!("{}:tag_res_name_map:{}", self.namespace, tag)
    }

    /// `token -> last-seen unix timestamp`
    #[must_use]
    pub fn token_last_update_time(&self) -> String {
        format!("{}:token_last_update_time", self.namespace)
    }

    /// The set of tokens whose liveness is governed by the auto-managed
    /// token reaper
    #[must_use]
    pub fn managed_tokens_list(&self) -> String {
        format!("{}:managed_tokens_list", self.namespace)
    }

    /// The pub/sub channel resource-status changes are announced on
    #[must_use]
    pub fn res_change_channel(&self) -> String {
        format!("{}:channel:res_change_event", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let keys = Keys::new("qrm");
        assert_eq!(keys.all_resources(), "qrm:all_resources");
        assert_eq!(keys.resource_jobs("r1"), "qrm:resource_name_r1");
        assert_eq!(keys.res_change_channel(), "qrm:channel:res_change_event");
    }
}
