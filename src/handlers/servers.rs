// src/handlers/servers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::models::Endpoint;
use crate::service::QueryService;
use crate::storage::SUGGESTION_LIMIT;
use crate::utils::{require_admin, AdminToken, RequestError};

#[derive(Deserialize)]
pub struct NewServer {
    name: String,
    hostname: String,
    port: i64,
}

#[derive(Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    prefix: String,
}

pub async fn list_servers(
    path: web::Path<u64>,
    service: web::Data<QueryService>,
) -> Result<HttpResponse, RequestError> {
    let community_id = path.into_inner();
    let mut servers = service.registry().list(community_id).await?;
    servers.sort_by(|a, b| a.name.cmp(&b.name));

    if servers.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({
            "servers": [],
            "message": "No game servers found.",
        })));
    }
    Ok(HttpResponse::Ok().json(json!({ "servers": servers })))
}

pub async fn suggest_servers(
    path: web::Path<u64>,
    query: web::Query<SuggestQuery>,
    service: web::Data<QueryService>,
) -> Result<HttpResponse, RequestError> {
    let community_id = path.into_inner();
    let servers = service
        .registry()
        .search_by_prefix(community_id, &query.prefix, SUGGESTION_LIMIT)
        .await?;
    let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
    Ok(HttpResponse::Ok().json(json!({ "suggestions": names })))
}

pub async fn add_server(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<NewServer>,
    service: web::Data<QueryService>,
    token: web::Data<AdminToken>,
) -> Result<HttpResponse, RequestError> {
    require_admin(&req, &token)?;
    let community_id = path.into_inner();
    let NewServer { name, hostname, port } = body.into_inner();

    let endpoint = Endpoint::checked(hostname, port)?;
    let server = service.registry().add(community_id, &name, endpoint).await?;
    info!("Community {} registered '{}' -> {}", community_id, server.name, server.endpoint);

    Ok(HttpResponse::Created().json(json!({
        "message": format!("Server '{}' added successfully.", server.name),
        "server": server,
    })))
}

pub async fn remove_server(
    req: HttpRequest,
    path: web::Path<(u64, String)>,
    service: web::Data<QueryService>,
    token: web::Data<AdminToken>,
) -> Result<HttpResponse, RequestError> {
    require_admin(&req, &token)?;
    let (community_id, name) = path.into_inner();

    service.registry().remove(community_id, &name).await?;
    info!("Community {} removed '{}'", community_id, name);

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Server '{}' removed successfully.", name),
    })))
}
