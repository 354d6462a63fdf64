//! Actix-web server for the Knowledge Vault API (feature-gated)

use std::sync::{Arc, Mutex, atomic::{AtomicU64, Ordering}};
use std::time::Duration;

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use tokio::runtime::Runtime;

use super::identity::{extract_bearer, LocalIdentity};
use super::service::VaultService;
use super::{bump_mutation_epoch, error_body, http_status, MutationHook};
use crate::persistence::settings::AppSettings;

// Store server state for stop/restart
struct ServerState {
    handle: Option<actix_web::dev::ServerHandle>,
    runtime: Option<Runtime>,
}

static SERVER_STATE: once_cell::sync::Lazy<Arc<Mutex<ServerState>>> = once_cell::sync::Lazy::new(|| {
    Arc::new(Mutex::new(ServerState { handle: None, runtime: None }))
});

static REQ_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct Cfg {
    service: VaultService<LocalIdentity>,
    log_dir: std::path::PathBuf,
    on_mutation: Option<MutationHook>,
}

fn ensure_dir(p: &std::path::Path) {
    if let Some(parent) = p.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

fn log_line(dir: &std::path::Path, line: &str) {
    use std::io::Write;
    let now = time::OffsetDateTime::now_utc();
    let date = time::macros::format_description!("[year][month][day]");
    let ts = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let fname = match now.format(&date) { Ok(s) => format!("api_{}.log", s), Err(_) => "api.log".to_string() };
    let path = dir.join(fname);
    ensure_dir(&path);
    let ts_s = now.format(&ts).unwrap_or_else(|_| String::new());
    let msg = format!("{} | {}\n", ts_s, line);
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        let _ = f.write_all(msg.as_bytes());
    }
}

fn next_request_id() -> String {
    let n = REQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    format!("{}-{}", now, n)
}

fn bearer(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    extract_bearer(header).map(str::to_string)
}

async fn handle_query(cfg: web::Data<Cfg>, req: HttpRequest, body: String) -> impl Responder {
    let rid = next_request_id();
    let peer = req.peer_addr().map(|a| a.to_string()).unwrap_or_else(|| "unknown".into());
    let t0 = std::time::Instant::now();

    let op = match VaultService::<LocalIdentity>::parse_op(&body) {
        Ok(op) => op,
        Err(e) => {
            log_line(&cfg.log_dir, &format!("RID={} HTTP /api/query from {} PARSE ERR {}", rid, peer, e));
            return HttpResponse::BadRequest().json(error_body(&e));
        }
    };
    let op_name = op.name();
    let mutation = op.is_mutation();
    log_line(&cfg.log_dir, &format!("RID={} HTTP /api/query from {} op={} blen={}", rid, peer, op_name, body.len()));

    let token = bearer(&req);
    let result = cfg.service.execute(token.as_deref(), op);
    let dt = t0.elapsed();
    match result {
        Ok(reply) => {
            if mutation {
                bump_mutation_epoch();
                if let Some(hook) = &cfg.on_mutation {
                    (**hook)();
                }
            }
            log::info!("api {} op={} ok dt_ms={}", rid, op_name, dt.as_millis());
            log_line(&cfg.log_dir, &format!("RID={} HTTP OK op={} dt_ms={}", rid, op_name, dt.as_millis()));
            HttpResponse::Ok().json(reply)
        }
        Err(e) => {
            let status = StatusCode::from_u16(http_status(&e)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            log::info!("api {} op={} status={} dt_ms={}", rid, op_name, status.as_u16(), dt.as_millis());
            log_line(&cfg.log_dir, &format!("RID={} HTTP ERR {} op={} {} dt_ms={}", rid, status.as_u16(), op_name, e, dt.as_millis()));
            HttpResponse::build(status).json(error_body(&e))
        }
    }
}

async fn handle_health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn build_server(bind: &str, cfg_data: Cfg) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(cfg_data.clone()))
            .route("/api/query", web::post().to(handle_query))
            .route("/api/health", web::get().to(handle_health))
    })
    .bind(bind)?
    .run())
}

pub fn start_server(cfg: &AppSettings, service: VaultService<LocalIdentity>, on_mutation: Option<MutationHook>) -> anyhow::Result<()> {
    let bind = cfg.api_endpoint();
    let log_dir = cfg.api_log_dir();
    stop_server();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build() {
                Ok(r) => r,
                Err(e) => {
                    log::error!("failed to create tokio runtime for API: {}", e);
                    return;
                }
            };

        rt.block_on(async move {
            let cfg_data = Cfg { service, log_dir: log_dir.clone(), on_mutation };
            log_line(&cfg_data.log_dir, &format!("Server starting on {}", bind));
            let server = match build_server(&bind, cfg_data) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("API server bind failed on {}: {}", bind, e);
                    return;
                }
            };
            if let Ok(mut st) = SERVER_STATE.lock() {
                st.handle = Some(server.handle());
            }
            log::info!("API listening on {}", bind);
            let _ = server.await;
        });
        if let Ok(mut st) = SERVER_STATE.lock() {
            st.runtime = Some(rt);
        }
    });
    Ok(())
}

/// Serve on the calling thread until the server is stopped (Ctrl-C).
pub fn run_blocking(cfg: &AppSettings, service: VaultService<LocalIdentity>, on_mutation: Option<MutationHook>) -> anyhow::Result<()> {
    let bind = cfg.api_endpoint();
    let log_dir = cfg.api_log_dir();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    rt.block_on(async move {
        let cfg_data = Cfg { service, log_dir, on_mutation };
        log_line(&cfg_data.log_dir, &format!("Headless server starting on {}", bind));
        let server = build_server(&bind, cfg_data)?;
        log::info!("API listening on {} (headless)", bind);
        server.await
    })?;
    Ok(())
}

pub fn stop_server() {
    let (handle, rt) = match SERVER_STATE.lock() {
        Ok(mut st) => (st.handle.take(), st.runtime.take()),
        Err(_) => return,
    };
    if let Some(h) = handle {
        let _ = h.stop(false);
    }
    if let Some(r) = rt {
        r.shutdown_timeout(Duration::from_millis(100));
    }
}

pub fn is_running() -> bool {
    SERVER_STATE.lock().map(|st| st.handle.is_some()).unwrap_or(false)
}
