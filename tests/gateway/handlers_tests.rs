use crate::common::{FakeLauncher, FakeProcess, server_dir, wait_for_status};
use actix_web::{App, http::StatusCode, test, web};
use mineserve::config::Config;
use mineserve::gateway;
use mineserve::{Mineserve, ServerStatus};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

fn mineserve() -> (Mineserve, UnboundedReceiver<FakeProcess>) {
    let (launcher, processes) = FakeLauncher::new();
    (Mineserve::with_launcher(Config::default(), launcher), processes)
}

macro_rules! init_app {
    ($mineserve:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($mineserve.clone()))
                .configure(gateway::routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_status_of_fresh_app() {
    let (app, _processes) = mineserve();
    let service = init_app!(app);

    let req = test::TestRequest::get().uri("/status").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(
        body,
        json!({
            "status": "offline",
            "running": false,
            "players": [],
            "directory": null,
            "autoArchiveMinutes": null
        })
    );
}

#[actix_web::test]
async fn test_start_without_directory_is_conflict() {
    let (app, mut processes) = mineserve();
    let service = init_app!(app);

    let req = test::TestRequest::post().uri("/server/start").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Server directory not set");
    assert_eq!(body["code"], 409);
    assert!(processes.try_recv().is_err());
}

#[actix_web::test]
async fn test_bind_missing_directory_is_not_found() {
    let (app, _processes) = mineserve();
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/directory")
        .set_json(json!({ "path": "/definitely/not/here" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_start_command_and_stop() {
    let dir = server_dir();
    let (app, mut processes) = mineserve();
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/directory")
        .set_json(json!({ "path": dir.path() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["directory"], json!(dir.path()));

    let req = test::TestRequest::post().uri("/server/start").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "starting");
    let process = processes.recv().await.unwrap();

    let req = test::TestRequest::post()
        .uri("/server/command")
        .set_json(json!({ "command": "say hi" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::post()
        .uri("/server/command")
        .set_json(json!({ "command": "say a\nstop" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post().uri("/server/stop").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["status"], "stopping");
    assert_eq!(process.input(), "say hi\nstop\n");

    process.exit(Some(0));
    assert!(wait_for_status(app.supervisor(), ServerStatus::Offline).await);

    let req = test::TestRequest::post()
        .uri("/server/command")
        .set_json(json!({ "command": "list" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_player_actions() {
    let dir = server_dir();
    let (app, mut processes) = mineserve();
    app.bind_directory(dir.path()).await.unwrap();
    app.supervisor().start().await.unwrap();
    let process = processes.recv().await.unwrap();
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/players/Alice/kick")
        .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::post()
        .uri("/players/Bob/ban")
        .set_json(json!({ "reason": "griefing" }))
        .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::post()
        .uri("/players/Bob/ban")
        .set_json(json!({ "duration": "1d" }))
        .to_request();
    assert_eq!(
        test::call_service(&service, req).await.status(),
        StatusCode::NOT_IMPLEMENTED
    );

    let req = test::TestRequest::post()
        .uri("/players/Alice/fly")
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid request: Unknown player action 'fly'");

    assert_eq!(
        process.input(),
        "kick Alice Kicked by admin\nban Bob griefing\n"
    );

    let req = test::TestRequest::get().uri("/players").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "count": 0, "names": [] }));
}

#[actix_web::test]
async fn test_properties_routes() {
    let dir = server_dir();
    let (app, _processes) = mineserve();
    let service = init_app!(app);

    let req = test::TestRequest::get().uri("/properties").to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::CONFLICT);

    app.bind_directory(dir.path()).await.unwrap();

    let req = test::TestRequest::put()
        .uri("/properties")
        .set_json(json!({ "motd": "Welcome", "max-players": 10, "pvp": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["max-players"], "10");

    let req = test::TestRequest::get().uri("/properties").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(
        body,
        json!({ "motd": "Welcome", "max-players": "10", "pvp": "false" })
    );
    let content = std::fs::read_to_string(dir.path().join("server.properties")).unwrap();
    assert!(content.contains("motd=Welcome\n"));
}

#[actix_web::test]
async fn test_archive_routes() {
    let dir = server_dir();
    let (app, _processes) = mineserve();
    app.bind_directory(dir.path()).await.unwrap();
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/archives")
        .set_json(json!({ "reason": "manual" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["fileName"].as_str().unwrap().starts_with("manual-"));
    assert_eq!(body["archived"], 1);

    let req = test::TestRequest::post().uri("/archives").to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::put()
        .uri("/archives/auto")
        .set_json(json!({ "enabled": true, "intervalMinutes": 0 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "intervalMinutes": null }));

    let req = test::TestRequest::put()
        .uri("/archives/auto")
        .set_json(json!({ "enabled": true, "intervalMinutes": 45 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "intervalMinutes": 45 }));
    assert_eq!(app.config().archive.interval_minutes, 45);

    let req = test::TestRequest::put()
        .uri("/archives/auto")
        .set_json(json!({ "enabled": true, "intervalMinutes": i64::MAX }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "intervalMinutes": 365 * 24 * 60 }));
    app.configure_auto_archive(false, 0);
}

#[actix_web::test]
async fn test_console_history_and_details() {
    let dir = server_dir();
    let (app, _processes) = mineserve();
    app.bind_directory(dir.path()).await.unwrap();
    let service = init_app!(app);

    let req = test::TestRequest::get().uri("/console?limit=1").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["event"], "console-log");
    assert!(
        entries[0]["payload"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Server directory set to")
    );

    let req = test::TestRequest::get().uri("/server/details").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, Value::Null);
}

#[actix_web::test]
async fn test_reset_directory_route() {
    let dir = server_dir();
    std::fs::write(dir.path().join("ops.json"), "[]").unwrap();
    let (app, _processes) = mineserve();
    app.bind_directory(dir.path()).await.unwrap();
    let service = init_app!(app);

    let req = test::TestRequest::post().uri("/directory/reset").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "removed": 2, "failed": 0 }));
    assert!(dir.path().join("backups").is_dir());
    assert!(!dir.path().join("server.jar").exists());
}
