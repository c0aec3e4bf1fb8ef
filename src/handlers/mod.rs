pub mod index;
pub mod query;
pub mod servers;

use actix_web::web;

/// Mounts every route on an actix `App` or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index::index))
        .route("/communities/{community_id}/info", web::get().to(query::query_info))
        .route("/communities/{community_id}/players", web::get().to(query::query_players))
        .service(
            web::resource("/communities/{community_id}/servers")
                .route(web::get().to(servers::list_servers))
                .route(web::post().to(servers::add_server)),
        )
        .route(
            "/communities/{community_id}/servers/suggest",
            web::get().to(servers::suggest_servers),
        )
        .route(
            "/communities/{community_id}/servers/{name}",
            web::delete().to(servers::remove_server),
        );
}
