use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Instant as Stopwatch;

use anyhow::{anyhow, Context, Result};
use tiny_http::{Header, Request, Response, Server};
use tracing::{error, info, warn};

use crate::deadline::{Clock, SystemClock};
use crate::encoding::RenderMode;
use crate::engine::{CountdownEngine, CountdownRequest};

pub const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate, max-age=0"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Transport-independent response produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub no_cache: bool,
}

impl ShellResponse {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.into().into_bytes(),
            no_cache: false,
        }
    }

    fn not_found() -> Self {
        Self::text(404, "Not Found")
    }
}

/// Routes one request. Pure apart from reading the static index file.
pub fn handle_request(
    engine: &CountdownEngine,
    clock: &dyn Clock,
    method: &str,
    url: &str,
) -> ShellResponse {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let mode = match path {
        "/countdown" => Some(RenderMode::Animated),
        "/countdown.png" => Some(RenderMode::Still),
        "/" | "/index.html" => None,
        _ => return ShellResponse::not_found(),
    };
    if !method.eq_ignore_ascii_case("GET") {
        return ShellResponse::text(405, "Method Not Allowed");
    }

    let Some(mode) = mode else {
        return static_index(engine);
    };

    let request = CountdownRequest::from_query(query);
    let now = engine.now(clock);
    match engine.render(&request, &now, mode) {
        Ok(rendered) => ShellResponse {
            status: 200,
            content_type: rendered.media_type.content_type(),
            body: rendered.bytes,
            no_cache: true,
        },
        Err(err) if err.is_caller_error() => {
            warn!(code = err.code(), error = %err, "rejected countdown request");
            ShellResponse::text(err.http_status(), err.user_message())
        }
        Err(err) => {
            error!(code = err.code(), error = %err, "countdown render failed");
            ShellResponse::text(err.http_status(), err.user_message())
        }
    }
}

fn static_index(engine: &CountdownEngine) -> ShellResponse {
    let path = engine.config().static_dir.join("index.html");
    match fs::read(&path) {
        Ok(body) => ShellResponse {
            status: 200,
            content_type: TEXT_HTML,
            body,
            no_cache: false,
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "static index unavailable");
            ShellResponse::not_found()
        }
    }
}

/// Binds `listen` and serves until the process exits, one worker thread per
/// configured worker, all pulling from the same listener.
pub fn serve(engine: Arc<CountdownEngine>, listen: &str) -> Result<()> {
    let server = Server::http(listen)
        .map_err(|err| anyhow!("failed to bind {listen}: {err}"))?;
    let server = Arc::new(server);
    let workers = engine.config().workers;
    info!(listen, workers, timezone = %engine.timezone(), "countdown server listening");

    let handles = (0..workers)
        .map(|index| {
            let server = Arc::clone(&server);
            let engine = Arc::clone(&engine);
            thread::Builder::new()
                .name(format!("countdown-worker-{index}"))
                .spawn(move || worker_loop(&server, &engine))
                .with_context(|| format!("failed to spawn worker {index}"))
        })
        .collect::<Result<Vec<_>>>()?;

    for handle in handles {
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
    }
    Ok(())
}

fn worker_loop(server: &Server, engine: &CountdownEngine) {
    let clock = SystemClock;
    for request in server.incoming_requests() {
        let started = Stopwatch::now();
        let method = request.method().to_string();
        let url = request.url().to_owned();
        let response = handle_request(engine, &clock, &method, &url);
        let status = response.status;

        if let Err(err) = respond(request, response) {
            warn!(%url, error = %err, "failed to write response");
        }
        info!(
            %method,
            path = url.split('?').next().unwrap_or_default(),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
    }
}

fn respond(request: Request, shell: ShellResponse) -> std::io::Result<()> {
    let mut response = Response::from_data(shell.body).with_status_code(shell.status);
    if let Ok(header) = Header::from_bytes("Content-Type", shell.content_type) {
        response.add_header(header);
    }
    if shell.no_cache {
        for (name, value) in NO_CACHE_HEADERS {
            if let Ok(header) = Header::from_bytes(name, value) {
                response.add_header(header);
            }
        }
    }
    request.respond(response)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::deadline::FixedClock;
    use crate::schema::CountdownConfig;

    fn engine(static_dir: &std::path::Path) -> CountdownEngine {
        let mut config = CountdownConfig::default();
        config.fonts.candidates.clear();
        config.max_frames = 3;
        config.static_dir = static_dir.to_path_buf();
        CountdownEngine::new(config).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap())
    }

    #[test]
    fn image_routes_return_media_with_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let gif = handle_request(&engine, &clock(), "GET", "/countdown?end=2025-12-31T23:59:59");
        assert_eq!(gif.status, 200);
        assert_eq!(gif.content_type, "image/gif");
        assert!(gif.no_cache);
        assert_eq!(&gif.body[..3], b"GIF");

        let png = handle_request(&engine, &clock(), "GET", "/countdown.png?end=2025-12-31T23:59");
        assert_eq!(png.status, 200);
        assert_eq!(png.content_type, "image/png");
        assert_eq!(&png.body[1..4], b"PNG");
    }

    #[test]
    fn caller_errors_are_plain_text_400() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let missing = handle_request(&engine, &clock(), "GET", "/countdown");
        assert_eq!(missing.status, 400);
        assert_eq!(missing.content_type, TEXT_PLAIN);
        assert!(!missing.no_cache);
        let missing_text = String::from_utf8(missing.body).unwrap();
        assert!(missing_text.contains("obrigatório"));

        let invalid = handle_request(&engine, &clock(), "GET", "/countdown.png?end=31-12-2025");
        assert_eq!(invalid.status, 400);
        assert!(String::from_utf8(invalid.body).unwrap().starts_with("Formato inválido"));

        let color = handle_request(
            &engine,
            &clock(),
            "GET",
            "/countdown.png?end=2025-12-31T23:59&bg=zzz",
        );
        assert_eq!(color.status, 400);
    }

    #[test]
    fn index_and_unknown_routes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        assert_eq!(handle_request(&engine, &clock(), "GET", "/").status, 404);
        fs::write(dir.path().join("index.html"), "<html>countdown</html>").unwrap();
        let index = handle_request(&engine, &clock(), "GET", "/");
        assert_eq!(index.status, 200);
        assert_eq!(index.content_type, TEXT_HTML);
        assert_eq!(index.body, b"<html>countdown</html>");

        assert_eq!(handle_request(&engine, &clock(), "GET", "/favicon.ico").status, 404);
        assert_eq!(handle_request(&engine, &clock(), "POST", "/countdown").status, 405);
    }
}
