// src/handlers/query.rs
use actix_web::{web, HttpResponse};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{format_duration, Endpoint, QueryKind, QueryReport, QueryResponse, ServerInfo};
use crate::service::QueryService;
use crate::utils::{check_rate_limit, CommunityRateLimiter, RequestError};

#[derive(Deserialize)]
pub struct QueryParams {
    q: String,
}

#[derive(Serialize)]
struct PlayerRow<'a> {
    name: &'a str,
    score: i32,
    duration: String,
    duration_secs: f32,
}

async fn run(
    community_id: u64,
    input: &str,
    kind: QueryKind,
    service: &QueryService,
    rate_limiter: &CommunityRateLimiter,
) -> Result<QueryReport, RequestError> {
    check_rate_limit(rate_limiter, community_id)?;
    debug!("Community {} requested {} for '{}'", community_id, kind, input);
    Ok(service.query(community_id, input, kind).await?)
}

fn security_line(info: &ServerInfo) -> String {
    let mut line = String::from(if info.vac_secured { "VAC Secured" } else { "Insecure" });
    if info.password_protected {
        line.push_str(" + Password Protected");
    }
    line
}

fn render_info(endpoint: &Endpoint, info: &ServerInfo) -> serde_json::Value {
    json!({
        "endpoint": endpoint.to_string(),
        "connect": format!("steam://connect/{}", endpoint),
        "name": info.name,
        "map": info.map,
        "game": info.game,
        "players": format!("{}/{}", info.player_count, info.max_players),
        "security": security_line(info),
        "info": info,
    })
}

pub async fn query_info(
    path: web::Path<u64>,
    params: web::Query<QueryParams>,
    service: web::Data<QueryService>,
    rate_limiter: web::Data<CommunityRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    let community_id = path.into_inner();
    let report = run(community_id, &params.q, QueryKind::Info, &service, &rate_limiter).await?;

    match &report.response {
        QueryResponse::Info(info) => Ok(HttpResponse::Ok().json(render_info(&report.endpoint, info))),
        QueryResponse::PlayerList(_) => Err(RequestError::Malformed(report.endpoint)),
    }
}

pub async fn query_players(
    path: web::Path<u64>,
    params: web::Query<QueryParams>,
    service: web::Data<QueryService>,
    rate_limiter: web::Data<CommunityRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    let community_id = path.into_inner();
    let report = run(community_id, &params.q, QueryKind::PlayerList, &service, &rate_limiter).await?;

    let players = match &report.response {
        QueryResponse::PlayerList(players) => players,
        QueryResponse::Info(_) => return Err(RequestError::Malformed(report.endpoint)),
    };
    if players.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({
            "endpoint": report.endpoint.to_string(),
            "players": [],
            "message": "Server is empty!",
        })));
    }

    let rows: Vec<PlayerRow<'_>> = players
        .iter()
        .map(|p| PlayerRow {
            name: &p.name,
            score: p.score,
            duration: format_duration(p.duration_secs),
            duration_secs: p.duration_secs,
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "endpoint": report.endpoint.to_string(),
        "players": rows,
    })))
}
