// src/query/mod.rs
pub mod decode;
pub mod fragment;
pub mod packet;

use log::{debug, warn};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};

use crate::error::QueryError;
use crate::models::{Endpoint, Player, QueryKind, QueryResponse, ServerInfo};
use fragment::{Assembly, Fragment, SplitAssembler};
use packet::{PacketReader, Request, SIMPLE_HEADER, SPLIT_HEADER, S2C_CHALLENGE};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Largest datagram we accept.
const MAX_PACKET_SIZE: usize = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitingFirstResponse,
    AwaitingChallengeReply,
}

/// Runs single info or player-list exchanges against game servers. Every
/// call owns its own socket and reassembly state; nothing is shared between
/// calls.
#[derive(Debug, Clone)]
pub struct QueryClient {
    timeout: Duration,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl QueryClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn info(&self, endpoint: &Endpoint) -> Result<ServerInfo, QueryError> {
        match self.query(endpoint, QueryKind::Info).await? {
            QueryResponse::Info(info) => Ok(info),
            QueryResponse::PlayerList(_) => Err(QueryError::malformed("player reply to info query")),
        }
    }

    pub async fn players(&self, endpoint: &Endpoint) -> Result<Vec<Player>, QueryError> {
        match self.query(endpoint, QueryKind::PlayerList).await? {
            QueryResponse::PlayerList(players) => Ok(players),
            QueryResponse::Info(_) => Err(QueryError::malformed("info reply to player query")),
        }
    }

    /// Performs one exchange. DNS lookup, the optional challenge round trip
    /// and fragment collection all share the one timeout; when it fires the
    /// exchange future is dropped, taking the socket and any buffered
    /// fragments with it.
    pub async fn query(&self, endpoint: &Endpoint, kind: QueryKind) -> Result<QueryResponse, QueryError> {
        match tokio::time::timeout(self.timeout, exchange(endpoint, kind)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                debug!("Query {} against {} failed: {}", kind, endpoint, e);
                Err(e)
            }
            Err(_) => {
                debug!("Query {} against {} timed out after {:?}", kind, endpoint, self.timeout);
                Err(QueryError::Timeout)
            }
        }
    }
}

async fn exchange(endpoint: &Endpoint, kind: QueryKind) -> Result<QueryResponse, QueryError> {
    let socket = connect(endpoint).await?;

    let mut request = Request::new(kind);
    send(&socket, &request).await?;
    let mut stage = Stage::AwaitingFirstResponse;

    loop {
        let body = receive(&socket).await?;
        let marker = *body
            .first()
            .ok_or_else(|| QueryError::malformed("empty response"))?;

        if marker == S2C_CHALLENGE {
            let token = PacketReader::new(&body[1..]).u32("challenge token")?;
            match stage {
                Stage::AwaitingFirstResponse => {
                    debug!("{} issued challenge {:#010x}", endpoint, token);
                    request = request.with_challenge(token);
                    send(&socket, &request).await?;
                    stage = Stage::AwaitingChallengeReply;
                    continue;
                }
                Stage::AwaitingChallengeReply => {
                    warn!("{} answered a challenged request with another challenge", endpoint);
                    return Err(QueryError::malformed("server issued a second challenge"));
                }
            }
        }

        if !packet::response_markers(kind).contains(&marker) {
            return Err(QueryError::malformed(format!(
                "unexpected response type {:#04x} for {} query",
                marker, kind
            )));
        }

        return match kind {
            QueryKind::Info => decode::decode_info(&body).map(QueryResponse::Info),
            QueryKind::PlayerList => decode::decode_players(&body).map(QueryResponse::PlayerList),
        };
    }
}

async fn connect(endpoint: &Endpoint) -> Result<UdpSocket, QueryError> {
    let addr = lookup_host((endpoint.hostname.as_str(), endpoint.port))
        .await
        .map_err(|e| QueryError::Unreachable(format!("could not resolve '{}': {}", endpoint.hostname, e)))?
        .next()
        .ok_or_else(|| QueryError::Unreachable(format!("no addresses for '{}'", endpoint.hostname)))?;

    let bind: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await.map_err(classify_io)?;
    // Connecting filters out datagrams from any other source.
    socket.connect(addr).await.map_err(classify_io)?;
    debug!("Querying {} at {}", endpoint, addr);
    Ok(socket)
}

async fn send(socket: &UdpSocket, request: &Request) -> Result<(), QueryError> {
    socket.send(&request.encode()).await.map_err(classify_io)?;
    Ok(())
}

/// Receives one complete message, reassembling split responses. Returns the
/// body that follows the `-1` header, starting with the response type byte.
async fn receive(socket: &UdpSocket) -> Result<Vec<u8>, QueryError> {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    let mut assembler: Option<SplitAssembler> = None;

    loop {
        let len = socket.recv(&mut buf).await.map_err(classify_io)?;
        let mut reader = PacketReader::new(&buf[..len]);

        match reader.i32("packet header")? {
            SIMPLE_HEADER => return Ok(reader.rest().to_vec()),
            SPLIT_HEADER => {
                let fragment = Fragment::parse(reader.rest())?;
                debug!(
                    "Fragment {}/{} of split response {:#010x}",
                    fragment.index + 1,
                    fragment.total,
                    fragment.id
                );
                let assembler = assembler
                    .get_or_insert_with(|| SplitAssembler::new(fragment.id, fragment.total));
                if let Assembly::Complete(body) = assembler.push(fragment)? {
                    return Ok(body);
                }
            }
            other => {
                return Err(QueryError::malformed(format!("unknown packet header {:#x}", other)));
            }
        }
    }
}

fn classify_io(e: io::Error) -> QueryError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::AddrNotAvailable => QueryError::Unreachable(e.to_string()),
        _ => match e.raw_os_error() {
            // ENETUNREACH / EHOSTUNREACH
            Some(101) | Some(113) => QueryError::Unreachable(e.to_string()),
            _ => QueryError::Unknown(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_and_unreachable_errors_classify_as_unreachable() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(matches!(classify_io(refused), QueryError::Unreachable(_)));
        assert!(matches!(
            classify_io(io::Error::from_raw_os_error(113)),
            QueryError::Unreachable(_)
        ));
    }

    #[test]
    fn other_io_errors_are_unknown() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(classify_io(denied), QueryError::Unknown(_)));
    }

    #[tokio::test]
    async fn unresolvable_host_is_unreachable() {
        let client = QueryClient::new(Duration::from_secs(5));
        let endpoint = Endpoint::new("does-not-exist.invalid", 27015);
        let result = client.query(&endpoint, QueryKind::Info).await;
        assert!(
            matches!(result, Err(QueryError::Unreachable(_)) | Err(QueryError::Timeout)),
            "{:?}",
            result
        );
    }
}
