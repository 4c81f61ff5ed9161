use std::net::SocketAddr;
use std::time::Duration;

use photon::{
    Bind, BindFrom, BoxError, Config, Controller, Error, Field, Registry, Request, RequestError,
    Response, Server, ServerConfig, StartupError,
};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

impl Bind for Greeting {
    const FROM: BindFrom = BindFrom::Query;
}

async fn hello(greeting: Greeting) -> Result<String, BoxError> {
    Ok(format!("hello {}", greeting.name))
}

async fn panics(_req: Request) -> Result<Response, RequestError> {
    panic!("handler blew up");
}

async fn body_len(req: Request) -> Result<String, RequestError> {
    Ok(req.body().len().to_string())
}

async fn stuck(_req: Request) -> Result<Response, RequestError> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Ok(Response::text("too late"))
}

async fn slow(_req: Request) -> Result<Response, RequestError> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(Response::text("done"))
}

fn config() -> ServerConfig {
    Config::from_toml(
        r#"
        [server]
        host = "127.0.0.1"
        port = "0"
        context-path = "/api"
        shutdown-timeout = 5
        "#,
    )
    .unwrap()
    .server
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_controller(
        Controller::new("/greet")
            .field(Field::new("Hello", r#"kind:"api" method:"get" path:"/hello""#).function(hello))
            .field(Field::new("Panic", r#"kind:"api" method:"get" path:"/panic""#).handler(panics))
            .field(Field::new("Slow", r#"kind:"api" method:"get" path:"/slow""#).handler(slow))
            .field(Field::new("Stuck", r#"kind:"api" method:"get" path:"/stuck""#).handler(stuck))
            .field(Field::new("Upload", r#"kind:"api" method:"post" path:"/upload""#).handler(body_len)),
    );
    registry
}

async fn send(addr: SocketAddr, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn post(addr: SocketAddr, target: &str, body: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "POST {target} HTTP/1.1\r\nhost: localhost\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_bound_parameters_over_http() {
    let handle = Server::new(config()).start(registry()).await.unwrap();

    let response = send(handle.local_addr(), "/api/greet/hello?name=ann").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("content-type: application/json"), "{response}");
    assert!(response.ends_with(r#""hello ann""#), "{response}");

    let response = send(handle.local_addr(), "/greet/hello?name=ann").await;
    assert!(response.starts_with("HTTP/1.1 404"), "{response}");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn a_panicking_handler_only_fails_its_request() {
    let handle = Server::new(config()).start(registry()).await.unwrap();

    let response = send(handle.local_addr(), "/api/greet/panic").await;
    assert!(response.starts_with("HTTP/1.1 500"), "{response}");
    assert!(response.ends_with("Internal Server Error"), "{response}");

    let response = send(handle.local_addr(), "/api/greet/hello?name=bob").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn stop_waits_for_in_flight_requests() {
    let handle = Server::new(config()).start(registry()).await.unwrap();
    let addr = handle.local_addr();

    let in_flight = tokio::spawn(async move { send(addr, "/api/greet/slow").await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop().await.unwrap();

    let response = in_flight.await.unwrap();
    assert!(response.ends_with("done"), "{response}");
}

#[tokio::test]
async fn custom_error_handler_is_used() {
    let handle = Server::new(config())
        .error_handler(|err| Response::builder().status(http::StatusCode::BAD_REQUEST).text(err.to_string()))
        .start(registry())
        .await
        .unwrap();

    let response = send(handle.local_addr(), "/api/greet/hello").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.contains("invalid query string"), "{response}");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn startup_fails_before_binding() {
    let mut registry = Registry::new();
    registry.register_controller(
        Controller::new("/greet")
            .field(Field::new("Hello", r#"kind:"api" method:"get" path:"/hello""#).function(hello))
            .field(Field::new("Again", r#"kind:"api" method:"post" path:"/hello""#).function(hello)),
    );

    let err = Server::new(config()).start(registry).await.err().unwrap();
    assert!(matches!(err, Error::Startup(StartupError::DuplicatePath(path)) if path == "/api/greet/hello"));
}

#[tokio::test]
async fn unparseable_address_is_reported() {
    let config = ServerConfig { host: "not an address".to_owned(), ..config() };
    let err = Server::new(config).start(registry()).await.err().unwrap();
    assert!(matches!(err, Error::Address(addr) if addr == "not an address:0"));
}

#[tokio::test]
async fn bodies_over_the_limit_are_rejected() {
    let config = ServerConfig { body_limit: 64, ..config() };
    let handle = Server::new(config).start(registry()).await.unwrap();

    let response = post(handle.local_addr(), "/api/greet/upload", &[b'x'; 64]).await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("64"), "{response}");

    let response = post(handle.local_addr(), "/api/greet/upload", &[b'x'; 65]).await;
    assert!(response.starts_with("HTTP/1.1 413"), "{response}");

    handle.stop().await.unwrap();
}

#[test]
fn default_body_limit_is_four_mebibytes() {
    assert_eq!(ServerConfig::default().body_limit, 4 * 1024 * 1024);
}

#[tokio::test]
async fn stop_reports_connections_that_outlive_the_shutdown_timeout() {
    let config = ServerConfig { shutdown_timeout: 1, ..config() };
    let handle = Server::new(config).start(registry()).await.unwrap();
    let addr = handle.local_addr();

    let in_flight = tokio::spawn(async move { send(addr, "/api/greet/stuck").await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = handle.stop().await.unwrap_err();
    assert!(matches!(err, Error::DrainTimeout(timeout) if timeout == Duration::from_secs(1)), "{err}");
    in_flight.abort();
}

#[tokio::test]
async fn dropping_the_handle_stops_the_server() {
    let handle = Server::new(config()).start(registry()).await.unwrap();
    let addr = handle.local_addr();
    drop(handle);

    let mut refused = false;
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refused, "listener still accepting after the handle was dropped");
}
