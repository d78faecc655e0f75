//! Domain records, change events and the HTTP DTOs built around them.

pub mod event;
pub mod hotel;
pub mod record;
pub mod requests;
pub mod responses;
pub mod user;

// Re-export commonly used types
pub use event::{ChangeEvent, Decoded, Operation};
pub use hotel::Hotel;
pub use record::{Record, RecordId};
pub use requests::{SearchPage, SearchParams, DEFAULT_SEARCH_LIMIT};
pub use responses::{CreatedResponse, DeleteResponse, EntityStats, HealthResponse, StatsResponse};
pub use user::User;
