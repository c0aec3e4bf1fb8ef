//! Game server query bot: speaks the Source/GoldSrc UDP query protocol to
//! answer "is this server up, and who is on it?", and keeps a per-community
//! list of named servers.

pub mod address;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod service;
pub mod storage;
pub mod utils;

pub use error::{AddressError, QueryError, QueryErrorKind, RegistryError, ServiceError};
pub use models::{Endpoint, NamedServer, Player, QueryKind, QueryReport, QueryResponse, ServerInfo};
pub use query::QueryClient;
pub use service::QueryService;
pub use storage::{MemoryRegistry, ServerRegistry, SqliteRegistry};
