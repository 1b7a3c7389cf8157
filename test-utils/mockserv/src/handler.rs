//! Request routing for one listening socket.

use crate::config::{Location, ServerBlock};
use crate::multipart;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, COOKIE, HOST, LOCATION, SET_COOKIE};
use hyper::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub type Reply = Response<Full<Bytes>>;

const SESSION_COOKIE: &str = "session";

/// Server blocks sharing one socket plus state shared by all of them.
pub struct Site {
    servers: Vec<ServerBlock>,
    sessions: Mutex<HashMap<String, u64>>,
    next_session: AtomicU64,
}

impl Site {
    pub fn new(servers: Vec<ServerBlock>) -> Self {
        Self {
            servers,
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    /// Match the Host header against server names; the first block is the
    /// default.
    pub fn select(&self, host: Option<&str>) -> Option<&ServerBlock> {
        let name = host.map(strip_port);
        name.and_then(|n| self.servers.iter().find(|s| s.answers_to(n)))
            .or_else(|| self.servers.first())
    }

    pub async fn handle(&self, req: Request<Incoming>) -> Result<Reply, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let reply = match self.select(host.as_deref()) {
            Some(server) => self.route(server, req).await,
            None => plain(StatusCode::INTERNAL_SERVER_ERROR, "no server block\n"),
        };
        info!(
            "{} {} host={} -> {}",
            method,
            path,
            host.as_deref().unwrap_or("-"),
            reply.status().as_u16()
        );
        Ok(reply)
    }

    async fn route(&self, server: &ServerBlock, req: Request<Incoming>) -> Reply {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        if path.split('/').any(|seg| seg == "..") {
            return error_page(server, StatusCode::BAD_REQUEST);
        }

        let implicit = Location {
            path: "/".to_string(),
            methods: vec!["GET".to_string(), "HEAD".to_string()],
            autoindex: false,
            upload_dir: None,
            redirect: None,
            session: false,
        };
        let location = server.location_for(&path).unwrap_or(&implicit);

        if !location.allows(method.as_str()) {
            let mut reply = error_page(server, StatusCode::METHOD_NOT_ALLOWED);
            if let Ok(allow) = HeaderValue::from_str(&location.methods.join(", ")) {
                reply.headers_mut().insert(ALLOW, allow);
            }
            return reply;
        }

        if let Some(target) = &location.redirect {
            return redirect(target);
        }

        let cookie = req
            .headers()
            .get(COOKIE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!("Failed to read request body: {}", e);
                return error_page(server, StatusCode::BAD_REQUEST);
            }
        };
        if let Some(limit) = server.client_max_body_size {
            if body.len() > limit {
                debug!("Body of {} bytes exceeds limit {}", body.len(), limit);
                return error_page(server, StatusCode::PAYLOAD_TOO_LARGE);
            }
        }

        if location.session {
            return self.session(cookie.as_deref());
        }

        if let Some(dir) = &location.upload_dir {
            let name = path
                .get(location.path.len()..)
                .unwrap_or("")
                .trim_start_matches('/');
            if method == Method::POST {
                if let Some(boundary) = content_type.as_deref().and_then(multipart::boundary) {
                    return store_parts(server, dir, body, &boundary).await;
                }
            }
            return upload(server, location, dir, name, &method, &body);
        }

        match method {
            Method::GET | Method::HEAD => serve_static(server, location, &path),
            _ => error_page(server, StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn session(&self, cookie: Option<&str>) -> Reply {
        let presented = cookie.and_then(|c| {
            c.split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(k, _)| *k == SESSION_COOKIE)
                .map(|(_, v)| v.to_string())
        });

        let mut sessions = self.sessions.lock();

        if let Some(id) = presented {
            if let Some(visits) = sessions.get_mut(&id) {
                *visits += 1;
                return plain(StatusCode::OK, format!("session {} visits {}\n", id, visits));
            }
        }

        let id = format!(
            "{:08x}{:08x}",
            std::process::id(),
            self.next_session.fetch_add(1, Ordering::Relaxed)
        );
        sessions.insert(id.clone(), 1);
        let mut reply = plain(StatusCode::OK, format!("session {} visits 1\n", id));
        if let Ok(value) = HeaderValue::from_str(&format!("{}={}; Path=/", SESSION_COOKIE, id)) {
            reply.headers_mut().insert(SET_COOKIE, value);
        }
        reply
    }
}

fn upload(
    server: &ServerBlock,
    location: &Location,
    dir: &Path,
    name: &str,
    method: &Method,
    body: &[u8],
) -> Reply {
    if name.contains('/') {
        return error_page(server, StatusCode::BAD_REQUEST);
    }
    let target = dir.join(name);

    match *method {
        Method::GET | Method::HEAD if name.is_empty() => {
            if location.autoindex {
                listing(&location.path, dir)
            } else {
                error_page(server, StatusCode::FORBIDDEN)
            }
        }
        Method::GET | Method::HEAD => match std::fs::read(&target) {
            Ok(data) => file_reply(&target, data),
            Err(_) => error_page(server, StatusCode::NOT_FOUND),
        },
        Method::POST => {
            if name.is_empty() {
                return error_page(server, StatusCode::BAD_REQUEST);
            }
            if target.exists() {
                return error_page(server, StatusCode::CONFLICT);
            }
            match std::fs::write(&target, body) {
                Ok(()) => empty(StatusCode::NO_CONTENT),
                Err(e) => {
                    warn!("Failed to store {}: {}", target.display(), e);
                    error_page(server, StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        Method::DELETE => {
            if name.is_empty() || !target.is_file() {
                return error_page(server, StatusCode::NOT_FOUND);
            }
            match std::fs::remove_file(&target) {
                Ok(()) => empty(StatusCode::NO_CONTENT),
                Err(e) => {
                    warn!("Failed to delete {}: {}", target.display(), e);
                    error_page(server, StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        _ => error_page(server, StatusCode::METHOD_NOT_ALLOWED),
    }
}

async fn store_parts(server: &ServerBlock, dir: &Path, body: Bytes, boundary: &str) -> Reply {
    let parts = match multipart::file_parts(body, boundary).await {
        Ok(parts) if !parts.is_empty() => parts,
        Ok(_) => return error_page(server, StatusCode::BAD_REQUEST),
        Err(e) => {
            debug!("Rejected multipart body: {}", e);
            return error_page(server, StatusCode::BAD_REQUEST);
        }
    };
    if parts.iter().any(|p| dir.join(&p.filename).exists()) {
        return error_page(server, StatusCode::CONFLICT);
    }
    for part in &parts {
        if let Err(e) = std::fs::write(dir.join(&part.filename), &part.data) {
            warn!("Failed to store {}: {}", part.filename, e);
            return error_page(server, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
    let names: Vec<&str> = parts.iter().map(|p| p.filename.as_str()).collect();
    plain(StatusCode::CREATED, format!("{}\n", names.join("\n")))
}

fn serve_static(server: &ServerBlock, location: &Location, path: &str) -> Reply {
    let target: PathBuf = server.root.join(path.trim_start_matches('/'));

    if target.is_dir() {
        let index = target.join(&server.index);
        if index.is_file() {
            return match std::fs::read(&index) {
                Ok(data) => file_reply(&index, data),
                Err(_) => error_page(server, StatusCode::FORBIDDEN),
            };
        }
        if location.autoindex {
            return listing(path, &target);
        }
        return error_page(server, StatusCode::FORBIDDEN);
    }

    match std::fs::read(&target) {
        Ok(data) => file_reply(&target, data),
        Err(_) => error_page(server, StatusCode::NOT_FOUND),
    }
}

fn listing(uri: &str, dir: &Path) -> Reply {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();

    let mut html = format!("<html><body><h1>Index of {}</h1><ul>\n", uri);
    for name in names {
        html.push_str(&format!("<li><a href=\"{0}\">{0}</a></li>\n", name));
    }
    html.push_str("</ul></body></html>\n");
    with_type(StatusCode::OK, "text/html", html.into_bytes())
}

fn redirect(target: &str) -> Reply {
    let mut reply = empty(StatusCode::MOVED_PERMANENTLY);
    match HeaderValue::from_str(target) {
        Ok(value) => {
            reply.headers_mut().insert(LOCATION, value);
            reply
        }
        Err(_) => plain(StatusCode::INTERNAL_SERVER_ERROR, "bad redirect target\n"),
    }
}

fn error_page(server: &ServerBlock, status: StatusCode) -> Reply {
    if let Some(page) = server.error_pages.get(&status.as_u16()) {
        match std::fs::read(page) {
            Ok(data) => return with_type(status, "text/html", data),
            Err(e) => warn!("Error page {} unreadable: {}", page.display(), e),
        }
    }
    let html = format!(
        "<html><body><h1>{} {}</h1></body></html>\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    with_type(status, "text/html", html.into_bytes())
}

fn file_reply(path: &Path, data: Vec<u8>) -> Reply {
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("txt") => "text/plain",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    };
    with_type(StatusCode::OK, mime, data)
}

fn plain(status: StatusCode, text: impl Into<String>) -> Reply {
    with_type(status, "text/plain", text.into().into_bytes())
}

fn with_type(status: StatusCode, mime: &'static str, data: Vec<u8>) -> Reply {
    let mut reply = Response::new(Full::new(Bytes::from(data)));
    *reply.status_mut() = status;
    reply
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    reply
}

fn empty(status: StatusCode) -> Reply {
    let mut reply = Response::new(Full::new(Bytes::new()));
    *reply.status_mut() = status;
    reply
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split(']').next().map(|h| &h[1..]).unwrap_or(host);
    }
    host.split(':').next().unwrap_or(host)
}
