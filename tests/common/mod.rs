//! In-process HTTP server standing in for the dataset website and datashare

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use robotcar_fetcher::app::{ClientConfig, Endpoints};

pub const CSRF_TOKEN: &str = "tok-123";
pub const SESSION_COOKIE: &str = "sessionid=s3ss10n";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";

/// A request as seen by the server
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Path and query, e.g. `/download/?filename=datasets/x/x_vo.tar`
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_session(&self) -> bool {
        self.header("cookie")
            .is_some_and(|cookies| cookies.contains(SESSION_COOKIE))
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    pub set_cookie: Option<String>,
    /// Body written in `pieces` parts with `delay` before each part
    pub pacing: Option<(usize, Duration)>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            set_cookie: None,
            pacing: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok(Vec::new())
        }
    }

    /// 200 response whose body trickles out in `pieces` parts
    pub fn paced(body: impl Into<Vec<u8>>, pieces: usize, delay: Duration) -> Self {
        Self {
            pacing: Some((pieces.max(1), delay)),
            ..Self::ok(body)
        }
    }
}

type Handler = dyn Fn(&Request) -> Response + Send + Sync;

pub struct TestServer {
    pub base: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    serve(stream, handler, log).await;
                });
            }
        });

        Self { base, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Client settings pointing every endpoint at this server
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            rate_limit_rps: 1000,
            endpoints: Endpoints::with_base(&self.base),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(mut stream: TcpStream, handler: Arc<Handler>, log: Arc<Mutex<Vec<Request>>>) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let response = handler(&request);
    log.lock().unwrap().push(request);

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: text/html\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    if let Some(cookie) = &response.set_cookie {
        head.push_str(&format!("Set-Cookie: {}; Path=/\r\n", cookie));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes()).await;
    match response.pacing {
        None => {
            let _ = stream.write_all(&response.body).await;
        }
        Some((pieces, delay)) => {
            let size = response.body.len().div_ceil(pieces).max(1);
            for piece in response.body.chunks(size) {
                tokio::time::sleep(delay).await;
                if stream.write_all(piece).await.is_err() || stream.flush().await.is_err() {
                    return;
                }
            }
        }
    }
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Request {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Login page with the Django CSRF hidden input
pub fn login_page() -> String {
    format!(
        r#"<html><body><form method="post">
            <input type="hidden" name="csrfmiddlewaretoken" value="{}">
            <input type="text" name="username">
            <input type="password" name="password">
        </form></body></html>"#,
        CSRF_TOKEN
    )
}

/// Handles `GET /` and `POST /` the way the datashare login does
pub fn handle_login(request: &Request) -> Option<Response> {
    if request.target != "/" {
        return None;
    }
    if request.method == "GET" {
        return Some(Response::ok(login_page()));
    }

    let expected = [
        format!("username={}", USERNAME),
        format!("password={}", PASSWORD),
        format!("csrfmiddlewaretoken={}", CSRF_TOKEN),
    ];
    if expected.iter().all(|field| request.body.contains(field.as_str())) {
        Some(Response {
            set_cookie: Some(SESSION_COOKIE.to_string()),
            ..Response::ok("<html>Welcome</html>")
        })
    } else {
        Some(Response::ok(
            "<html>Login failed. Please try again or email for support.</html>",
        ))
    }
}

/// Tar archive holding `<dataset>/<sensor>/<name>` entries
pub fn tar_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap()
}
