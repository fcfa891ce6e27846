pub mod store;
pub use store::{CheckinStore, CheckinTransaction};
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod alert_repo;
pub use alert_repo::AlertRepository;
pub mod response_repo;
pub use response_repo::ResponseRepository;
pub mod pg_store;
pub use pg_store::PgCheckinStore;
pub mod memory_store;
pub use memory_store::MemoryCheckinStore;
