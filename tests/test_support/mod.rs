#![allow(dead_code)]

use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// A running `prodhubd` bound to an ephemeral port. Killed on drop.
pub struct Server {
    child: Child,
    pub addr: String,
    pub workspace: PathBuf,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.workspace);
    }
}

pub fn spawn_server(prefix: &str) -> Server {
    spawn_server_with(prefix, &[])
}

pub fn spawn_server_with(prefix: &str, env: &[(&str, String)]) -> Server {
    let workspace = temp_dir(prefix);
    let exe = env!("CARGO_BIN_EXE_prodhubd");
    let mut cmd = Command::new(exe);
    cmd.current_dir(&workspace)
        .env("PRODHUB_BIND", "127.0.0.1:0")
        .env("PRODHUB_DB", workspace.join("hub.db"))
        .env_remove("PRODHUB_DOCS_ROOT")
        .env_remove("PRODHUB_CORS_ORIGIN")
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (k, v) in env {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn prodhubd");
    let stdout = child.stdout.take().expect("child stdout");
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    reader.read_line(&mut line).expect("read listening line");
    let ready: Value = serde_json::from_str(line.trim()).expect("parse listening line");
    let addr = ready
        .get("listening")
        .and_then(|v| v.as_str())
        .expect("listening address")
        .to_string();
    Server {
        child,
        addr,
        workspace,
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("non-JSON body ({}): {}", e, self.body))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn dechunk(raw: &str) -> String {
    let mut out = String::new();
    let mut rest = raw;
    loop {
        let Some((size_line, tail)) = rest.split_once("\r\n") else {
            break;
        };
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        out.push_str(&tail[..size]);
        rest = &tail[size..];
        rest = rest.strip_prefix("\r\n").unwrap_or(rest);
    }
    out
}

impl Server {
    pub fn request(&self, method: &str, path: &str, body: Option<&Value>) -> Response {
        self.request_with_headers(method, path, body, &[])
    }

    pub fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        extra: &[(&str, &str)],
    ) -> Response {
        let mut stream = TcpStream::connect(&self.addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("read timeout");
        let payload = body.map(|b| b.to_string()).unwrap_or_default();
        let mut req = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Length: {}\r\n",
            method,
            path,
            self.addr,
            payload.len()
        );
        if body.is_some() {
            req.push_str("Content-Type: application/json\r\n");
        }
        for (k, v) in extra {
            req.push_str(&format!("{}: {}\r\n", k, v));
        }
        req.push_str("\r\n");
        req.push_str(&payload);
        stream.write_all(req.as_bytes()).expect("write request");
        stream.flush().expect("flush request");

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).expect("read response");
        let raw = String::from_utf8(raw).expect("utf8 response");
        let (head, rest) = raw.split_once("\r\n\r\n").expect("response head");
        let mut lines = head.split("\r\n");
        let status_line = lines.next().expect("status line");
        let status: u16 = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .expect("status code");
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let chunked = headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("transfer-encoding") && v.eq_ignore_ascii_case("chunked")
        });
        let body = if chunked {
            dechunk(rest)
        } else {
            rest.to_string()
        };
        Response {
            status,
            headers,
            body,
        }
    }

    pub fn get(&self, path: &str) -> Response {
        self.request("GET", path, None)
    }

    pub fn post(&self, path: &str, body: Value) -> Response {
        self.request("POST", path, Some(&body))
    }

    pub fn put(&self, path: &str, body: Value) -> Response {
        self.request("PUT", path, Some(&body))
    }

    pub fn patch(&self, path: &str, body: Value) -> Response {
        self.request("PATCH", path, Some(&body))
    }

    pub fn delete(&self, path: &str) -> Response {
        self.request("DELETE", path, None)
    }

    /// Asserts `expected` and returns the decoded JSON body.
    pub fn expect_status(&self, resp: Response, expected: u16) -> Value {
        assert_eq!(
            resp.status, expected,
            "unexpected status, body: {}",
            resp.body
        );
        resp.json()
    }
}
