//! HTTP request handlers for the gateway.
//!
//! Every handler receives the shared [`Mineserve`] through `web::Data` and
//! forwards to the supervisor or the archive coordinator. Errors come back as
//! `{ "error": ..., "code": ... }` with a status matching the failure.

use crate::Mineserve;
use crate::gateway::actix_error::ApiError;
use crate::gateway::events::notification_stream;
use crate::notify::Notification;
use crate::properties::PropertiesMap;

use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

type HandlerResult = std::result::Result<HttpResponse, ApiError>;

/// Body of `POST /directory`
#[derive(Debug, Deserialize)]
pub struct BindDirectoryRequest {
    pub path: String,
}

/// Body of `POST /server/command`
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// Optional body of the player moderation routes
#[derive(Debug, Default, Deserialize)]
pub struct PlayerActionRequest {
    pub reason: Option<String>,
    pub duration: Option<String>,
}

/// Optional body of `POST /archives`
#[derive(Debug, Default, Deserialize)]
pub struct ArchiveRequest {
    pub reason: Option<String>,
}

/// Body of `PUT /archives/auto`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoArchiveRequest {
    pub enabled: bool,
    pub interval_minutes: i64,
}

/// Query of `GET /console`
#[derive(Debug, Deserialize)]
pub struct ConsoleQuery {
    pub limit: Option<usize>,
}

/// Response of `GET /status`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: crate::ServerStatus,
    pub running: bool,
    pub players: Vec<String>,
    pub directory: Option<PathBuf>,
    pub auto_archive_minutes: Option<u64>,
}

/// SSE stream of every notification
///
/// The stream opens with the current status and player list so a fresh
/// client does not have to wait for the next change.
pub async fn events(app: web::Data<Mineserve>, req: HttpRequest) -> HttpResponse {
    tracing::debug!(peer = ?req.peer_addr(), "Client connected to event stream");

    let receiver = app.subscribe();
    let players = app.supervisor().players().await;
    let initial = vec![
        Notification::ServerStatus {
            status: app.supervisor().status(),
        },
        Notification::PlayerCountUpdate(players.len()),
        Notification::PlayerListUpdate { names: players },
    ];

    HttpResponse::Ok()
        .append_header(("Content-Type", "text/event-stream"))
        .append_header(("Cache-Control", "no-cache"))
        .append_header(("Connection", "keep-alive"))
        .streaming(notification_stream(initial, receiver))
}

/// Recent console and backup log history
pub async fn console(app: web::Data<Mineserve>, query: web::Query<ConsoleQuery>) -> HttpResponse {
    HttpResponse::Ok().json(app.hub().recent(query.limit))
}

pub async fn status(app: web::Data<Mineserve>) -> HttpResponse {
    let supervisor = app.supervisor();
    HttpResponse::Ok().json(StatusResponse {
        status: supervisor.status(),
        running: supervisor.is_running().await,
        players: supervisor.players().await,
        directory: supervisor.directory().await,
        auto_archive_minutes: app
            .archives()
            .auto_archive_interval()
            .map(|i| i.as_secs() / 60),
    })
}

pub async fn bind_directory(
    app: web::Data<Mineserve>,
    body: web::Json<BindDirectoryRequest>,
) -> HandlerResult {
    let directory = app.bind_directory(body.path.trim()).await?;
    Ok(HttpResponse::Ok().json(json!({ "directory": directory })))
}

pub async fn reset_directory(app: web::Data<Mineserve>) -> HandlerResult {
    let report = app.reset_directory().await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn server_details(app: web::Data<Mineserve>) -> HandlerResult {
    let details = app.supervisor().server_details().await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn start(app: web::Data<Mineserve>) -> HandlerResult {
    app.supervisor().start().await?;
    Ok(status_accepted(&app))
}

pub async fn stop(app: web::Data<Mineserve>) -> HandlerResult {
    app.supervisor().stop().await?;
    Ok(status_accepted(&app))
}

pub async fn restart(app: web::Data<Mineserve>) -> HandlerResult {
    app.supervisor().restart().await?;
    Ok(status_accepted(&app))
}

pub async fn command(app: web::Data<Mineserve>, body: web::Json<CommandRequest>) -> HandlerResult {
    app.supervisor().send_command(&body.command).await?;
    Ok(HttpResponse::Accepted().json(json!({ "sent": body.command.trim() })))
}

pub async fn players(app: web::Data<Mineserve>) -> HttpResponse {
    let names = app.supervisor().announce_players().await;
    HttpResponse::Ok().json(json!({ "count": names.len(), "names": names }))
}

/// `POST /players/{name}/{action}` for kick, ban, op and deop
pub async fn player_action(
    app: web::Data<Mineserve>,
    path: web::Path<(String, String)>,
    body: Option<web::Json<PlayerActionRequest>>,
) -> HandlerResult {
    let (player, action) = path.into_inner();
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    let reason = body.reason.as_deref();
    let supervisor = app.supervisor();

    match action.as_str() {
        "kick" => supervisor.kick(&player, reason).await?,
        "ban" => supervisor.ban(&player, reason, body.duration.as_deref()).await?,
        "op" => supervisor.op(&player).await?,
        "deop" => supervisor.deop(&player).await?,
        other => {
            return Err(ApiError::InvalidRequest(format!(
                "Unknown player action '{}'",
                other
            )));
        }
    }
    Ok(HttpResponse::Accepted().json(json!({ "player": player, "action": action })))
}

pub async fn get_properties(app: web::Data<Mineserve>) -> HandlerResult {
    let properties = app.supervisor().get_properties().await?;
    Ok(HttpResponse::Ok().json(properties))
}

pub async fn save_properties(
    app: web::Data<Mineserve>,
    body: web::Json<PropertiesMap>,
) -> HandlerResult {
    let properties = body.into_inner();
    app.supervisor().save_properties(properties.clone()).await?;
    Ok(HttpResponse::Ok().json(properties))
}

/// Archive now; the work runs on a blocking thread
pub async fn create_archive(
    app: web::Data<Mineserve>,
    body: Option<web::Json<ArchiveRequest>>,
) -> HandlerResult {
    let reason = body.and_then(|b| b.into_inner().reason);
    let report = app.create_archive(reason).await?;
    Ok(HttpResponse::Created().json(report))
}

pub async fn auto_archive(
    app: web::Data<Mineserve>,
    body: web::Json<AutoArchiveRequest>,
) -> HttpResponse {
    app.configure_auto_archive(body.enabled, body.interval_minutes);
    HttpResponse::Ok().json(json!({
        "intervalMinutes": app.archives().auto_archive_interval().map(|i| i.as_secs() / 60)
    }))
}

fn status_accepted(app: &Mineserve) -> HttpResponse {
    HttpResponse::Accepted().json(json!({ "status": app.supervisor().status() }))
}
