use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::engine::Monitor;
use crate::models::{StatusSnapshot, HEALTHY, NEVER_PROBED};

/// One dashboard row, pre-formatted so the template stays logic free.
#[derive(Debug, Clone)]
pub struct AppRow {
    pub name: String,
    pub url: String,
    pub status_code: i32,
    pub status_color: &'static str,
    pub chat_room: String,
    pub chat_link: String,
    pub mail_down: String,
    pub mail_up: String,
    pub checked_at: String,
}

pub fn status_color(status_code: i32) -> &'static str {
    match status_code {
        HEALTHY => "green",
        NEVER_PROBED => "white",
        _ => "red",
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    apps: &'a [AppRow],
}

/// Renders the dashboard for `rows`, in the order given.
pub fn render(rows: &[AppRow]) -> askama::Result<String> {
    DashboardTemplate { apps: rows }.render()
}

async fn collect_rows(monitor: &Monitor) -> Vec<AppRow> {
    let mut rows = Vec::with_capacity(monitor.apps().len());
    for app in monitor.apps() {
        let status = app.status().await;
        let config = &app.config;
        rows.push(AppRow {
            name: config.name.clone(),
            url: config.url.clone(),
            status_code: status.status_code,
            status_color: status_color(status.status_code),
            chat_room: config.hipchat_room.clone(),
            chat_link: format!(
                "https://{}.hipchat.com/chat/room/{}",
                monitor.config.hipchat_subdomain, config.hipchat_room
            ),
            mail_down: config.mail_address_to_down.join(", "),
            mail_up: config.mail_address_to_up.join(", "),
            checked_at: status.checked_at_display(),
        });
    }
    rows
}

pub async fn dashboard(State(monitor): State<Arc<Monitor>>) -> Response {
    let rows = collect_rows(&monitor).await;
    match render(&rows) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Dashboard render failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "dashboard render failed").into_response()
        }
    }
}

pub async fn get_status(State(monitor): State<Arc<Monitor>>) -> Json<Vec<StatusSnapshot>> {
    let mut snapshot = Vec::with_capacity(monitor.apps().len());
    for app in monitor.apps() {
        let status = app.status().await;
        snapshot.push(StatusSnapshot {
            name: app.config.name.clone(),
            url: app.config.url.clone(),
            status_code: status.status_code,
            checked_at: status.checked_at_display(),
        });
    }
    Json(snapshot)
}

pub fn create_router(monitor: Arc<Monitor>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/status", get(get_status))
        .with_state(monitor)
}

pub async fn start_server(port: u16, monitor: Arc<Monitor>) -> std::io::Result<()> {
    let app = create_router(monitor);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard: http://localhost:{}", addr.port());
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, NotifierConfig};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn monitor(apps: Vec<AppConfig>) -> Arc<Monitor> {
        let config = NotifierConfig {
            cron: "@every 1m".into(),
            hipchat_subdomain: "acme".into(),
            apps,
            ..Default::default()
        };
        Arc::new(Monitor::with_notifiers(config, Vec::new()).unwrap())
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn status_colors() {
        assert_eq!(status_color(200), "green");
        assert_eq!(status_color(0), "white");
        assert_eq!(status_color(500), "red");
        assert_eq!(status_color(-1), "red");
    }

    #[tokio::test]
    async fn empty_registry_renders_empty_table() {
        let resp = create_router(monitor(Vec::new()))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let html = body_string(resp).await;
        assert!(html.contains("<table"));
        assert!(html.contains("<tbody>"));
        assert!(!html.contains("<td"));
    }

    #[tokio::test]
    async fn renders_apps_in_registry_order() {
        let apps = vec![
            AppConfig {
                name: "Zeta".into(),
                url: "http://zeta.local".into(),
                hipchat_room: "ops".into(),
                mail_address_to_down: vec!["a@x.com".into(), "b@x.com".into()],
                ..Default::default()
            },
            AppConfig { name: "Alpha".into(), url: "http://alpha.local".into(), ..Default::default() },
        ];
        let resp = create_router(monitor(apps))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let html = body_string(resp).await;
        let zeta = html.find("Zeta").unwrap();
        let alpha = html.find("Alpha").unwrap();
        assert!(zeta < alpha);
        assert!(html.contains("acme.hipchat.com"));
        assert!(html.contains("a@x.com, b@x.com"));
        assert!(html.contains("background-color: white"));
    }

    #[test]
    fn render_escapes_app_names() {
        let row = AppRow {
            name: "<script>".into(),
            url: "http://x.local".into(),
            status_code: 500,
            status_color: status_color(500),
            chat_room: String::new(),
            chat_link: String::new(),
            mail_down: String::new(),
            mail_up: String::new(),
            checked_at: "2024-01-01T00:00:00Z".into(),
        };
        let html = render(&[row]).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("background-color: red"));
        assert!(html.contains("2024-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn status_endpoint_returns_json_snapshot() {
        let apps = vec![AppConfig { name: "API".into(), url: "http://api.local".into(), ..Default::default() }];
        let resp = create_router(monitor(apps))
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json[0]["name"], "API");
        assert_eq!(json[0]["status_code"], 0);
        assert_eq!(json[0]["checked_at"], "");
    }
}
