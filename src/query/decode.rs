// src/query/decode.rs
use super::packet::{PacketReader, S2A_INFO_GOLDSRC, S2A_INFO_SOURCE, S2A_PLAYER};
use crate::error::QueryError;
use crate::models::{Player, ServerInfo};

/// Longest player name kept; anything past it is clipped.
pub const MAX_PLAYER_NAME_CHARS: usize = 128;

const THE_SHIP_APP_ID: u16 = 2400;

const EDF_PORT: u8 = 0x80;
const EDF_STEAM_ID: u8 = 0x10;
const EDF_SOURCE_TV: u8 = 0x40;
const EDF_KEYWORDS: u8 = 0x20;
const EDF_GAME_ID: u8 = 0x01;

/// Decodes an info reply, marker byte included. Both the Source and the
/// GoldSrc layouts are accepted.
pub fn decode_info(body: &[u8]) -> Result<ServerInfo, QueryError> {
    let mut reader = PacketReader::new(body);
    match reader.u8("response type")? {
        S2A_INFO_SOURCE => decode_source_info(&mut reader),
        S2A_INFO_GOLDSRC => decode_goldsrc_info(&mut reader),
        other => Err(QueryError::malformed(format!(
            "expected info reply, got type {:#04x}",
            other
        ))),
    }
}

fn decode_source_info(reader: &mut PacketReader<'_>) -> Result<ServerInfo, QueryError> {
    let protocol = reader.u8("protocol")?;
    let name = reader.string("server name")?;
    let map = reader.string("map")?;
    let folder = reader.string("folder")?;
    let game = reader.string("game")?;
    let app_id = reader.u16("app id")?;
    let player_count = reader.u8("player count")?;
    let max_players = reader.u8("max players")?;
    let bot_count = reader.u8("bot count")?;
    let server_type = char::from(reader.u8("server type")?);
    let platform = char::from(reader.u8("platform")?);
    let password_protected = reader.bool("visibility")?;
    let vac_secured = reader.bool("vac")?;
    if app_id == THE_SHIP_APP_ID {
        // mode, witnesses, duration
        reader.skip(3, "ship fields")?;
    }
    let version = reader.string("version")?;

    let mut info = ServerInfo {
        protocol,
        name,
        map,
        folder,
        game,
        app_id,
        player_count,
        max_players,
        bot_count,
        server_type,
        platform,
        password_protected,
        vac_secured,
        version,
        game_port: None,
        steam_id: None,
        keywords: None,
        game_id: None,
    };

    if reader.remaining() == 0 {
        return Ok(info);
    }
    let edf = reader.u8("extra data flag")?;
    if edf & EDF_PORT != 0 {
        info.game_port = Some(reader.u16("game port")?);
    }
    if edf & EDF_STEAM_ID != 0 {
        info.steam_id = Some(reader.u64("steam id")?);
    }
    if edf & EDF_SOURCE_TV != 0 {
        reader.u16("sourcetv port")?;
        reader.string("sourcetv name")?;
    }
    if edf & EDF_KEYWORDS != 0 {
        info.keywords = Some(reader.string("keywords")?);
    }
    if edf & EDF_GAME_ID != 0 {
        info.game_id = Some(reader.u64("game id")?);
    }
    Ok(info)
}

fn decode_goldsrc_info(reader: &mut PacketReader<'_>) -> Result<ServerInfo, QueryError> {
    let _address = reader.string("address")?;
    let name = reader.string("server name")?;
    let map = reader.string("map")?;
    let folder = reader.string("folder")?;
    let game = reader.string("game")?;
    let player_count = reader.u8("player count")?;
    let max_players = reader.u8("max players")?;
    let protocol = reader.u8("protocol")?;
    let server_type = char::from(reader.u8("server type")?);
    let platform = char::from(reader.u8("platform")?);
    let password_protected = reader.bool("visibility")?;
    if reader.bool("mod flag")? {
        reader.string("mod link")?;
        reader.string("mod download link")?;
        reader.u8("mod padding")?;
        reader.i32("mod version")?;
        reader.i32("mod size")?;
        reader.u8("mod type")?;
        reader.u8("mod dll")?;
    }
    let vac_secured = reader.bool("vac")?;
    let bot_count = reader.u8("bot count")?;

    Ok(ServerInfo {
        protocol,
        name,
        map,
        folder,
        game,
        app_id: 0,
        player_count,
        max_players,
        bot_count,
        server_type,
        platform,
        password_protected,
        vac_secured,
        version: String::new(),
        game_port: None,
        steam_id: None,
        keywords: None,
        game_id: None,
    })
}

/// Decodes a player list reply, marker byte included. Entries keep the order
/// the server sent them in.
pub fn decode_players(body: &[u8]) -> Result<Vec<Player>, QueryError> {
    let mut reader = PacketReader::new(body);
    let kind = reader.u8("response type")?;
    if kind != S2A_PLAYER {
        return Err(QueryError::malformed(format!(
            "expected player reply, got type {:#04x}",
            kind
        )));
    }

    let count = reader.u8("player count")?;
    let mut players = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = reader.u8("player index")?;
        let name = clip_name(reader.string("player name")?);
        let score = reader.i32("player score")?;
        let duration_secs = sanitize_duration(reader.f32("player duration")?);
        players.push(Player { index, name, score, duration_secs });
    }
    Ok(players)
}

fn clip_name(name: String) -> String {
    match name.char_indices().nth(MAX_PLAYER_NAME_CHARS) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name,
    }
}

fn sanitize_duration(secs: f32) -> f32 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_info(edf: Option<&[u8]>) -> Vec<u8> {
        let mut body = vec![S2A_INFO_SOURCE, 17];
        for s in ["My Server", "de_dust2", "cstrike", "Counter-Strike: Source"] {
            body.extend_from_slice(s.as_bytes());
            body.push(0);
        }
        body.extend_from_slice(&240u16.to_le_bytes());
        body.extend_from_slice(&[5, 10, 1, b'd', b'l', 1, 1]);
        body.extend_from_slice(b"1.0.0.71\0");
        if let Some(edf) = edf {
            body.extend_from_slice(edf);
        }
        body
    }

    #[test]
    fn decodes_source_info() {
        let info = decode_info(&source_info(None)).unwrap();
        assert_eq!(info.name, "My Server");
        assert_eq!(info.map, "de_dust2");
        assert_eq!(info.game, "Counter-Strike: Source");
        assert_eq!(info.app_id, 240);
        assert_eq!((info.player_count, info.max_players, info.bot_count), (5, 10, 1));
        assert_eq!(info.server_type, 'd');
        assert!(info.password_protected);
        assert!(info.vac_secured);
        assert_eq!(info.version, "1.0.0.71");
        assert_eq!(info.game_port, None);
    }

    #[test]
    fn decodes_extra_data_block() {
        let mut edf = vec![EDF_PORT | EDF_KEYWORDS | EDF_GAME_ID];
        edf.extend_from_slice(&27016u16.to_le_bytes());
        edf.extend_from_slice(b"secure,increased_maxplayers\0");
        edf.extend_from_slice(&240u64.to_le_bytes());

        let info = decode_info(&source_info(Some(&edf))).unwrap();
        assert_eq!(info.game_port, Some(27016));
        assert_eq!(info.keywords.as_deref(), Some("secure,increased_maxplayers"));
        assert_eq!(info.game_id, Some(240));
        assert_eq!(info.steam_id, None);
    }

    #[test]
    fn truncated_info_is_malformed() {
        let body = source_info(None);
        for cut in [1, 5, 30, body.len() - 1] {
            assert!(
                matches!(decode_info(&body[..cut]), Err(QueryError::Malformed(_))),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn decodes_goldsrc_info() {
        let mut body = vec![S2A_INFO_GOLDSRC];
        for s in ["192.0.2.1:27015", "Old School", "crossfire", "valve", "Half-Life"] {
            body.extend_from_slice(s.as_bytes());
            body.push(0);
        }
        body.extend_from_slice(&[3, 16, 47, b'd', b'w', 0, 0, 1, 2]);

        let info = decode_info(&body).unwrap();
        assert_eq!(info.name, "Old School");
        assert_eq!(info.map, "crossfire");
        assert_eq!((info.player_count, info.max_players), (3, 16));
        assert!(!info.password_protected);
        assert!(info.vac_secured);
        assert_eq!(info.bot_count, 2);
    }

    fn player(body: &mut Vec<u8>, index: u8, name: &[u8], score: i32, duration: f32) {
        body.push(index);
        body.extend_from_slice(name);
        body.push(0);
        body.extend_from_slice(&score.to_le_bytes());
        body.extend_from_slice(&duration.to_le_bytes());
    }

    #[test]
    fn decodes_players_in_server_order() {
        let mut body = vec![S2A_PLAYER, 2];
        player(&mut body, 0, b"zed", 7, 125.0);
        player(&mut body, 1, b"alice", 3, 10.5);

        let players = decode_players(&body).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "zed");
        assert_eq!(players[0].score, 7);
        assert_eq!(players[0].duration_secs, 125.0);
        assert_eq!(players[1].name, "alice");
    }

    #[test]
    fn empty_player_list() {
        assert!(decode_players(&[S2A_PLAYER, 0]).unwrap().is_empty());
    }

    #[test]
    fn player_count_beyond_data_is_malformed() {
        let mut body = vec![S2A_PLAYER, 3];
        player(&mut body, 0, b"only", 0, 1.0);
        assert!(matches!(decode_players(&body), Err(QueryError::Malformed(_))));
    }

    #[test]
    fn hostile_player_fields_are_bounded() {
        let long = vec![b'x'; 500];
        let mut body = vec![S2A_PLAYER, 2];
        player(&mut body, 0, &long, 0, -50.0);
        player(&mut body, 1, b"ok", 0, f32::INFINITY);

        let players = decode_players(&body).unwrap();
        assert_eq!(players[0].name.chars().count(), MAX_PLAYER_NAME_CHARS);
        assert_eq!(players[0].duration_secs, 0.0);
        assert_eq!(players[1].duration_secs, 0.0);
    }

    #[test]
    fn wrong_marker_is_malformed() {
        assert!(matches!(decode_players(&[S2A_INFO_SOURCE]), Err(QueryError::Malformed(_))));
        assert!(matches!(decode_info(&[S2A_PLAYER, 0]), Err(QueryError::Malformed(_))));
    }
}
