use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use web_server::config::ServerConfig;
use web_server::server::{Server, ShutdownHandle};

fn make_resources() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "hello world").unwrap();
    fs::write(dir.path().join("400.html"), "<h1>400</h1>").unwrap();
    fs::write(dir.path().join("403.html"), "<h1>403</h1>").unwrap();
    fs::write(dir.path().join("404.html"), "<h1>404</h1>").unwrap();
    fs::write(dir.path().join("error.html"), "<h1>error</h1>").unwrap();
    fs::write(dir.path().join("welcome.html"), "<h1>welcome</h1>").unwrap();
    dir
}

fn start_server(port: u16, timeout_ms: u64) -> (TempDir, ShutdownHandle, thread::JoinHandle<()>) {
    let dir = make_resources();
    let config = ServerConfig {
        port,
        timeout_ms,
        worker_threads: 2,
        open_log: false,
        root_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let mut server = Server::new(config).expect("server init");
    let handle = server.shutdown_handle();
    let joiner = thread::spawn(move || server.run().expect("server run"));
    // Give the reactor a moment to enter its loop.
    thread::sleep(Duration::from_millis(100));
    (dir, handle, joiner)
}

fn connect(port: u16) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(3)))
        .unwrap();
    stream
}

fn read_until_close(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    let _ = stream.read_to_end(&mut out);
    String::from_utf8_lossy(&out).into_owned()
}

/// Reads exactly one response, using its Content-length to stop.
fn read_one_response(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).expect("read headers");
        assert!(n > 0, "connection closed before headers were complete");
        buf.extend_from_slice(&chunk[..n]);
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("Content-length: "))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).expect("read body");
        assert!(n > 0, "connection closed mid body");
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf[..header_end + content_length]).into_owned()
}

#[test]
fn test_root_file_is_served() {
    let (_dir, handle, joiner) = start_server(18081, 60_000);
    let mut stream = connect(18081);
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .unwrap();

    let response = read_until_close(&mut stream);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(response.contains("Content-type: text/html\r\n"));
    assert!(response.contains("Content-length: 11\r\n"));
    assert!(response.ends_with("hello world"));

    handle.shutdown();
    joiner.join().unwrap();
}

#[test]
fn test_missing_file_yields_404_page() {
    let (_dir, handle, joiner) = start_server(18082, 60_000);
    let mut stream = connect(18082);
    stream
        .write_all(b"GET /nope.html HTTP/1.1\r\nHost: x\r\n\r\n")
        .unwrap();

    let response = read_until_close(&mut stream);
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.ends_with("<h1>404</h1>"));

    handle.shutdown();
    joiner.join().unwrap();
}

#[test]
fn test_keep_alive_serves_sequential_requests() {
    let (_dir, handle, joiner) = start_server(18083, 60_000);
    let mut stream = connect(18083);

    stream
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();
    let first = read_one_response(&mut stream);
    assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(first.contains("Connection: keep-alive\r\n"));
    assert!(first.contains("keep-alive: max=6, timeout=120\r\n"));
    assert!(first.ends_with("hello world"));

    // Same socket, second request.
    stream
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();
    let second = read_one_response(&mut stream);
    assert!(second.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(second.ends_with("hello world"));

    handle.shutdown();
    joiner.join().unwrap();
}

#[test]
fn test_garbage_request_line_yields_400_and_close() {
    let (_dir, handle, joiner) = start_server(18084, 60_000);
    let mut stream = connect(18084);
    stream.write_all(b"GARBAGE\r\n\r\n").unwrap();

    let response = read_until_close(&mut stream);
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(response.ends_with("<h1>400</h1>"));

    handle.shutdown();
    joiner.join().unwrap();
}

#[test]
fn test_form_login_lands_on_welcome_page() {
    let (_dir, handle, joiner) = start_server(18085, 60_000);
    let mut stream = connect(18085);
    stream
        .write_all(
            b"POST /login.html HTTP/1.1\r\n\
              Content-Type: application/x-www-form-urlencoded\r\n\r\n\
              username=a&password=b",
        )
        .unwrap();

    let response = read_until_close(&mut stream);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("<h1>welcome</h1>"));

    handle.shutdown();
    joiner.join().unwrap();
}
