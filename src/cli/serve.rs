//! Preview server.
//!
//! Serves a directory of rendered pages with every HTML response passed
//! through the pipeline, plus the service worker, the diagnostics script and
//! the beacon endpoint they report to.

use crate::config::PerfConfig;
use crate::embed::artifact::{
    CDN_CACHE_SW_JS, CDN_CACHE_SW_PATH, DIAGNOSTICS_JS, DIAGNOSTICS_PATH, PERFORMANCE_LOG_PATH,
};
use crate::pipeline::{OptimizationPipeline, Outcome};
use crate::response::BufferedResponse;
use crate::utils::mime::{self, types};
use crate::{debug, log};
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Beacon bodies above this are cut before logging.
const MAX_BEACON_BYTES: u64 = 64 * 1024;

static SERVER: OnceLock<Arc<Server>> = OnceLock::new();
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

// =============================================================================
// Lifecycle
// =============================================================================

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Ctrl+C unblocks the request loop; before the server exists it exits.
fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        if let Some(server) = SERVER.get() {
            log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow!("failed to set Ctrl+C handler: {}", e))
}

fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

pub fn serve_site(config: &PerfConfig) -> Result<()> {
    setup_shutdown_handler()?;

    let root = config.serve.root.clone();
    if !root.is_dir() {
        log!("error"; "serve root {} does not exist", root.display());
    }

    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    let _ = SERVER.set(Arc::clone(&server));
    log!("serve"; "http://{}", addr);

    let pipeline = Arc::new(OptimizationPipeline::new(config));
    let root = Arc::new(root);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let pipeline = Arc::clone(&pipeline);
        let root = Arc::clone(&root);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &pipeline, &root) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

// =============================================================================
// Routing
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Route {
    ServiceWorker,
    Diagnostics,
    PerformanceLog,
    File(PathBuf),
    MethodNotAllowed,
    NotFound,
}

fn route(method: &Method, url: &str, root: &Path) -> Route {
    let path = url.split(['?', '#']).next().unwrap_or_default();

    if path == PERFORMANCE_LOG_PATH {
        return if *method == Method::Post {
            Route::PerformanceLog
        } else {
            Route::MethodNotAllowed
        };
    }
    if !matches!(method, Method::Get | Method::Head) {
        return Route::MethodNotAllowed;
    }
    match path {
        CDN_CACHE_SW_PATH => Route::ServiceWorker,
        DIAGNOSTICS_PATH => Route::Diagnostics,
        _ => resolve_path(path, root).map_or(Route::NotFound, Route::File),
    }
}

/// Resolve URL to filesystem path, handling index.html for directories
fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.contains("..") {
        return None;
    }

    let local = serve_root.join(&clean);
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Percent-decode and trim slashes.
fn normalize_url(path: &str) -> String {
    use percent_encoding::percent_decode_str;
    percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
        .trim_matches('/')
        .to_string()
}

// =============================================================================
// Handlers
// =============================================================================

fn handle_request(request: Request, pipeline: &OptimizationPipeline, root: &Path) -> Result<()> {
    if is_shutdown() {
        return send(request, 503, types::PLAIN, b"503 Service Unavailable".to_vec(), &[]);
    }

    debug!("serve"; "{} {}", request.method(), request.url());
    match route(request.method(), request.url(), root) {
        Route::ServiceWorker => send(
            request,
            200,
            types::JAVASCRIPT,
            CDN_CACHE_SW_JS.as_bytes().to_vec(),
            &[("Service-Worker-Allowed", "/".to_string())],
        ),
        Route::Diagnostics => send(request, 200, types::JAVASCRIPT, DIAGNOSTICS_JS.as_bytes().to_vec(), &[]),
        Route::PerformanceLog => log_beacon(request),
        Route::File(path) => respond_file(request, &path, pipeline),
        Route::MethodNotAllowed => send(request, 405, types::PLAIN, b"405 Method Not Allowed".to_vec(), &[]),
        Route::NotFound => send(request, 404, types::PLAIN, b"404 Not Found".to_vec(), &[]),
    }
}

fn log_beacon(mut request: Request) -> Result<()> {
    let mut body = String::new();
    request
        .as_reader()
        .take(MAX_BEACON_BYTES)
        .read_to_string(&mut body)
        .context("Failed to read beacon body")?;

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => log!("perf"; "{}", value),
        Err(_) => log!("perf"; "{}", body.trim()),
    }
    send(request, 204, types::PLAIN, Vec::new(), &[])
}

fn respond_file(request: Request, path: &Path, pipeline: &OptimizationPipeline) -> Result<()> {
    let content_type = mime::from_path(path);
    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if !mime::is_html(content_type) {
        return send(request, 200, content_type, body, &[]);
    }

    let (headers, body) = render_bytes(pipeline, path, body);
    let extra: Vec<(&str, String)> = headers
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();
    send(request, 200, content_type, body, &extra)
}

/// Optimize an HTML file's bytes. Bytes that are not UTF-8 come back as is.
fn render_bytes(pipeline: &OptimizationPipeline, path: &Path, body: Vec<u8>) -> (Vec<(String, String)>, Vec<u8>) {
    match String::from_utf8(body) {
        Ok(html) => {
            let (headers, html) = render_page(pipeline, html).into_parts();
            (headers, html.into_bytes())
        }
        Err(err) => {
            log!("serve"; "{} is not UTF-8, sent unoptimized", path.display());
            (Vec::new(), err.into_bytes())
        }
    }
}

/// Run a page through the pipeline.
fn render_page(pipeline: &OptimizationPipeline, html: String) -> BufferedResponse {
    let mut response = BufferedResponse::html(html);
    if let Outcome::Optimized { failed } = pipeline.process(&mut response)
        && !failed.is_empty()
    {
        log!("error"; "stages failed: {}", failed.join(", "));
    }
    response
}

fn send(
    request: Request,
    status: u16,
    content_type: &str,
    body: Vec<u8>,
    extra: &[(&str, String)],
) -> Result<()> {
    let is_head = *request.method() == Method::Head;
    let mut response = Response::from_data(if is_head { Vec::new() } else { body })
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?);
    for header in valid_headers(extra) {
        response = response.with_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// Extra headers that tiny_http accepts. The rest are logged and dropped so
/// the body still goes out.
fn valid_headers(extra: &[(&str, String)]) -> Vec<Header> {
    extra
        .iter()
        .filter_map(|(name, value)| match make_header(name, value) {
            Ok(header) => Some(header),
            Err(e) => {
                log!("error"; "dropped header: {e}");
                None
            }
        })
        .collect()
}

fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}
