// Backend boundary: REST client, cancellable fetch wrapper, and the
// payload-normalization layer that maps loose server shapes into fixed types.

pub mod client;
pub mod resource;
pub mod types;

pub use client::{ApiClient, ApiError, NewCommittee, NewMember};
pub use resource::RemoteResource;
