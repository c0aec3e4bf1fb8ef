pub mod server;

pub use server::{
    format_duration, Endpoint, NamedServer, Player, QueryKind, QueryReport, QueryResponse,
    ServerInfo,
};
