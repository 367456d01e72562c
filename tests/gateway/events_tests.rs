use crate::common::FakeLauncher;
use actix_web::body::MessageBody;
use actix_web::{App, http::StatusCode, test, web};
use futures::StreamExt;
use mineserve::config::Config;
use mineserve::gateway::{self, events::notification_stream};
use mineserve::notify::{EventHub, LogLine, Notification, NotificationSink};
use mineserve::{Mineserve, ServerStatus};

#[actix_web::test]
async fn test_stream_sends_initial_then_live() {
    let hub = EventHub::new(16);
    let receiver = hub.subscribe();
    let initial = vec![Notification::ServerStatus {
        status: ServerStatus::Offline,
    }];
    let stream = notification_stream(initial, receiver);

    hub.notify(Notification::PlayerCountUpdate(2));
    hub.notify(Notification::BackupLog(LogLine::info("Creating backup x.zip...")));
    drop(hub);

    let frames: Vec<String> = Box::pin(stream)
        .map(|frame| String::from_utf8(frame.unwrap().to_vec()).unwrap())
        .collect()
        .await;

    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames[0],
        "id: 0\nevent: server-status\ndata: {\"status\":\"offline\"}\n\n"
    );
    assert_eq!(
        frames[1],
        "id: 1\nevent: player-count-update\ndata: 2\n\n"
    );
    assert!(frames[2].starts_with("id: 2\nevent: backup-log\ndata: {"));
}

#[actix_web::test]
async fn test_lagging_client_keeps_streaming() {
    let hub = EventHub::new(2);
    let receiver = hub.subscribe();
    let stream = notification_stream(Vec::new(), receiver);

    for count in 0..5 {
        hub.notify(Notification::PlayerCountUpdate(count));
    }
    drop(hub);

    let frames: Vec<_> = Box::pin(stream).collect().await;
    // Only the newest entries fit in the channel
    assert_eq!(frames.len(), 2);
    let last = String::from_utf8(frames[1].as_ref().unwrap().to_vec()).unwrap();
    assert!(last.ends_with("event: player-count-update\ndata: 4\n\n"));
}

#[actix_web::test]
async fn test_events_route_opens_with_snapshot() {
    let (launcher, _processes) = FakeLauncher::new();
    let app = Mineserve::with_launcher(Config::default(), launcher);
    let service = test::init_service(
        App::new()
            .app_data(web::Data::new(app.clone()))
            .configure(gateway::routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/events").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(app.hub().subscriber_count(), 1);

    let mut body = Box::pin(resp.into_body());
    let first = futures::future::poll_fn(|cx| body.as_mut().poll_next(cx))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        &first[..],
        b"id: 0\nevent: server-status\ndata: {\"status\":\"offline\"}\n\n"
    );
    let second = futures::future::poll_fn(|cx| body.as_mut().poll_next(cx))
        .await
        .unwrap()
        .unwrap();
    assert!(std::str::from_utf8(&second).unwrap().contains("player-count-update"));
}
