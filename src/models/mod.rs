//! Data types shared by the resource store, the allocation engine, and the
//! HTTP routes

mod jobs;
mod management;
mod requests;
mod resources;
mod status;
pub mod tokens;
mod version;

pub use jobs::Job;
pub use management::{SetResourceStatusRequest, SetServerStatusRequest, TagRequest};
pub use requests::{
    CancelTokenRequest, OpenRequest, OrigGroup, OrigRequest, ResourcesByName, ResourcesByTags,
    ResourcesRequest, ResourcesRequestResponse, ServerUpStatus, TokenQuery,
};
pub use resources::{Resource, ResourceStatus};
pub use status::{ResourceStatusEntry, StatusSnapshot};
pub use version::Version;
