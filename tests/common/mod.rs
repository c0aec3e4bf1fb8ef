#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use querybot::Endpoint;

/// A scripted game server on loopback. For every datagram it receives, the
/// script returns the datagrams to send back.
pub struct FakeServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn spawn<F>(mut script: F) -> Self
    where
        F: FnMut(usize, &[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            let mut n = 0;
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let request = buf[..len].to_vec();
                seen.lock().unwrap().push(request.clone());
                for reply in script(n, &request) {
                    let _ = socket.send_to(&reply, peer).await;
                }
                n += 1;
            }
        });

        Self { addr, requests, task }
    }

    /// A server that reads requests but never answers.
    pub async fn silent() -> Self {
        Self::spawn(|_, _| Vec::new()).await
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.addr.port())
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// A complete single-packet Source info reply.
pub fn info_packet(map: &str, players: u8, max_players: u8) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x49, 17];
    cstr(&mut out, "Test Server");
    cstr(&mut out, map);
    cstr(&mut out, "cstrike");
    cstr(&mut out, "Counter-Strike: Source");
    out.extend_from_slice(&240u16.to_le_bytes());
    out.extend_from_slice(&[players, max_players, 0, b'd', b'l', 0, 1]);
    cstr(&mut out, "1.0.0.71");
    out
}

/// A complete single-packet player reply.
pub fn players_packet(players: &[(&str, i32, f32)]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x44, players.len() as u8];
    for (i, (name, score, duration)) in players.iter().enumerate() {
        out.push(i as u8);
        cstr(&mut out, name);
        out.extend_from_slice(&score.to_le_bytes());
        out.extend_from_slice(&duration.to_le_bytes());
    }
    out
}

pub fn challenge_packet(token: u32) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x41];
    out.extend_from_slice(&token.to_le_bytes());
    out
}

/// Splits a whole packet into `-2` fragments of at most `chunk` payload bytes.
pub fn split_packet(id: u32, packet: &[u8], chunk: usize) -> Vec<Vec<u8>> {
    let parts: Vec<&[u8]> = packet.chunks(chunk).collect();
    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            let mut out = vec![0xFE, 0xFF, 0xFF, 0xFF];
            out.extend_from_slice(&id.to_le_bytes());
            out.push(parts.len() as u8);
            out.push(index as u8);
            out.extend_from_slice(&1248u16.to_le_bytes());
            out.extend_from_slice(part);
            out
        })
        .collect()
}
