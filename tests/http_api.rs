mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use common::{info_packet, players_packet, FakeServer};
use governor::{Quota, RateLimiter};
use querybot::address::DEFAULT_PORT;
use querybot::handlers;
use querybot::utils::{AdminToken, CommunityRateLimiter};
use querybot::{MemoryRegistry, QueryClient, QueryService};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const TOKEN: &str = "let-me-in";

fn state(burst: u32) -> (
    web::Data<QueryService>,
    web::Data<CommunityRateLimiter>,
    web::Data<AdminToken>,
) {
    let service = QueryService::new(
        Arc::new(MemoryRegistry::new()),
        QueryClient::new(Duration::from_millis(300)),
        DEFAULT_PORT,
    );
    let quota = Quota::per_minute(NonZeroU32::new(burst).unwrap());
    (
        web::Data::new(service),
        web::Data::new(RateLimiter::keyed(quota)),
        web::Data::new(AdminToken(Some(TOKEN.to_string()))),
    )
}

macro_rules! app {
    ($burst:expr) => {{
        let (service, limiter, token) = state($burst);
        test::init_service(
            App::new()
                .app_data(service)
                .app_data(limiter)
                .app_data(token)
                .configure(handlers::configure),
        )
        .await
    }};
}

#[actix_web::test]
async fn registry_lifecycle() {
    let app = app!(10);

    let req = test::TestRequest::post()
        .uri("/communities/1/servers")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", TOKEN)))
        .set_json(json!({ "name": "main", "hostname": "203.0.113.5", "port": 27015 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/communities/1/servers")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", TOKEN)))
        .set_json(json!({ "name": "main", "hostname": "203.0.113.6", "port": 27016 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Server 'main' already exists.");

    let req = test::TestRequest::get().uri("/communities/1/servers").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["servers"][0]["name"], "main");
    assert_eq!(body["servers"][0]["endpoint"]["port"], 27015);

    let req = test::TestRequest::get()
        .uri("/communities/1/servers/suggest?prefix=MA")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["suggestions"], json!(["main"]));

    let req = test::TestRequest::delete()
        .uri("/communities/1/servers/main")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", TOKEN)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri("/communities/1/servers/main")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", TOKEN)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn mutation_requires_admin_token() {
    let app = app!(10);

    let req = test::TestRequest::post()
        .uri("/communities/1/servers")
        .set_json(json!({ "name": "main", "hostname": "203.0.113.5", "port": 27015 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/communities/1/servers").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["servers"], json!([]));
}

#[actix_web::test]
async fn out_of_range_port_is_rejected() {
    let app = app!(10);
    let req = test::TestRequest::post()
        .uri("/communities/1/servers")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", TOKEN)))
        .set_json(json!({ "name": "main", "hostname": "203.0.113.5", "port": 70000 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn info_route_renders_server() {
    let server = FakeServer::spawn(|_, _| vec![info_packet("de_dust2", 5, 10)]).await;
    let app = app!(10);

    let uri = format!("/communities/1/info?q=127.0.0.1:{}", server.addr.port());
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["map"], "de_dust2");
    assert_eq!(body["players"], "5/10");
    assert_eq!(body["security"], "VAC Secured");
}

#[actix_web::test]
async fn players_route_formats_durations() {
    let server = FakeServer::spawn(|_, _| vec![players_packet(&[("alice", 2, 125.0)])]).await;
    let app = app!(10);

    let uri = format!("/communities/1/players?q=127.0.0.1:{}", server.addr.port());
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["players"][0]["name"], "alice");
    assert_eq!(body["players"][0]["duration"], "02:05");
}

#[actix_web::test]
async fn empty_server_says_so() {
    let server = FakeServer::spawn(|_, _| vec![players_packet(&[])]).await;
    let app = app!(10);

    let uri = format!("/communities/1/players?q=127.0.0.1:{}", server.addr.port());
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(body["message"], "Server is empty!");
}

#[actix_web::test]
async fn offline_server_maps_to_gateway_timeout() {
    let server = FakeServer::silent().await;
    let app = app!(10);

    let uri = format!("/communities/1/info?q=127.0.0.1:{}", server.addr.port());
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        format!("Server '127.0.0.1:{}' is offline.", server.addr.port())
    );
}

#[actix_web::test]
async fn invalid_address_is_bad_request() {
    let app = app!(10);
    let req = test::TestRequest::get()
        .uri("/communities/1/info?q=host:notaport")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn queries_are_rate_limited_per_community() {
    let app = app!(1);

    let req = test::TestRequest::get().uri("/communities/1/info?q=bad:port").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/communities/1/info?q=bad:port").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::TOO_MANY_REQUESTS);

    let req = test::TestRequest::get().uri("/communities/2/info?q=bad:port").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
