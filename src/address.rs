// src/address.rs
use std::net::Ipv6Addr;

use crate::error::AddressError;
use crate::models::Endpoint;

/// Default query port for Source and GoldSrc servers.
pub const DEFAULT_PORT: u16 = 27015;

/// Parses `host[:port]` into an endpoint, without touching DNS.
///
/// A bare IPv6 literal takes the default port; use `[addr]:port` to give one
/// explicitly.
pub fn parse(raw: &str, default_port: u16) -> Result<Endpoint, AddressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }

    if let Some(rest) = raw.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| AddressError::UnclosedBracket(raw.to_string()))?;
        if host.is_empty() {
            return Err(AddressError::Empty);
        }
        return match tail {
            "" => Ok(Endpoint::new(host, default_port)),
            _ => match tail.strip_prefix(':') {
                Some(port) => Ok(Endpoint::new(host, parse_port(port)?)),
                None => Err(AddressError::InvalidPort(tail.to_string())),
            },
        };
    }

    if raw.parse::<Ipv6Addr>().is_ok() {
        return Ok(Endpoint::new(raw, default_port));
    }

    match raw.split_once(':') {
        None => Ok(Endpoint::new(raw, default_port)),
        Some((_, port)) if port.contains(':') => {
            Err(AddressError::TooManySeparators(raw.to_string()))
        }
        Some(("", _)) => Err(AddressError::Empty),
        Some((host, port)) => Ok(Endpoint::new(host, parse_port(port)?)),
    }
}

fn parse_port(port: &str) -> Result<u16, AddressError> {
    port.parse::<u16>()
        .map_err(|_| AddressError::InvalidPort(port.to_string()))
}
