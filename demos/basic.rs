//! Minimal photon example: a users controller with typed, validated
//! parameters, controller-scoped middleware and one global middleware.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/42
//!   curl 'http://localhost:3000/api/users/list?page=2&per_page=10'
//!   curl -X POST http://localhost:3000/api/users/create \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","email":"alice@example.com"}'
//!   curl -X POST http://localhost:3000/api/users/create \
//!        -H 'content-type: application/json' -d '{"name":"","email":"nope"}'
//!   curl -X DELETE http://localhost:3000/api/users/delete/42 -H 'x-api-key: secret'

use http::StatusCode;
use photon::{
    Bind, BindFrom, BoxError, Config, Controller, Field, GlobalMiddlewareEntry, HttpError, Next,
    Registry, Request, RequestError, Response, Server, Valid,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = "3000"
swagger = "/docs"
context-path = "/api"
shutdown-timeout = 10
"#;

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
    email: String,
}

#[derive(Deserialize, Validate)]
struct NewUser {
    #[validate(length(min = 1, max = 64))]
    name: String,
    #[validate(email)]
    email: String,
}

impl Bind for NewUser {
    const FROM: BindFrom = BindFrom::Body;
}

#[derive(Deserialize, Validate)]
struct Page {
    #[serde(default = "first_page")]
    #[validate(range(min = 1))]
    page: u32,
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 100))]
    per_page: u32,
}

fn first_page() -> u32 { 1 }
fn default_per_page() -> u32 { 20 }

impl Bind for Page {
    const FROM: BindFrom = BindFrom::Query;
}

#[derive(Deserialize)]
struct UserId {
    id: u64,
}

impl Bind for UserId {
    const FROM: BindFrom = BindFrom::Path;
}

#[derive(Deserialize)]
struct ApiKey {
    #[serde(rename = "x-api-key", default)]
    key: String,
}

impl Bind for ApiKey {
    const FROM: BindFrom = BindFrom::Header;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_toml(CONFIG)?;

    let users = Controller::new("/users")
        .field(Field::new("List", r#"kind:"api" method:"get" path:"/list""#).function(list_users))
        .field(Field::new("Get", r#"kind:"api" method:"get" path:"/{id}""#).function(get_user))
        .field(Field::new("Create", r#"kind:"api" method:"post" path:"/create""#).function(create_user))
        .field(Field::new("Delete", r#"kind:"api" method:"delete" path:"/delete/{id}""#).function(delete_user))
        .field(Field::new("Ping", r#"kind:"api" method:"get" path:"/ping""#).handler(ping))
        .field(Field::new("Audit", r#"kind:"middleware" regex:"^/(delete/)?[{]id[}]$""#).middleware(audit))
        .field(Field::new("Trace", r#"kind:"middleware" prefix:"/""#).middleware(trace));

    let mut registry = Registry::new();
    registry
        .register_controller(users)
        .register_global_middleware(GlobalMiddlewareEntry::new("/api", 10, request_id));

    Server::new(config.server).serve(registry).await?;
    Ok(())
}

// GET /api/users/list?page=&per_page=
async fn list_users(Valid(page): Valid<Page>) -> Result<Vec<User>, BoxError> {
    let first = first_id(&page);
    Ok((first..first + 2)
        .map(|id| User { id, name: format!("user{id}"), email: format!("user{id}@example.com") })
        .collect())
}

// Id of the first user on `page`; wide enough for any `u32` page number.
fn first_id(page: &Page) -> u64 {
    (u64::from(page.page) - 1) * u64::from(page.per_page) + 1
}

// GET /api/users/{id}
async fn get_user(id: UserId) -> Result<User, HttpError> {
    if id.id == 0 {
        return Err(HttpError::new(StatusCode::NOT_FOUND, "no such user"));
    }
    Ok(User { id: id.id, name: "alice".to_owned(), email: "alice@example.com".to_owned() })
}

// POST /api/users/create
async fn create_user(Valid(user): Valid<NewUser>) -> Result<User, BoxError> {
    Ok(User { id: 99, name: user.name, email: user.email })
}

// DELETE /api/users/delete/{id}
async fn delete_user(id: UserId, key: ApiKey) -> Result<u64, HttpError> {
    if key.key != "secret" {
        return Err(HttpError::new(StatusCode::UNAUTHORIZED, "missing or wrong x-api-key"));
    }
    Ok(id.id)
}

async fn ping(_req: Request) -> Result<Response, RequestError> {
    Ok(Response::text("pong"))
}

async fn audit(req: Request, next: Next) -> Result<Response, RequestError> {
    tracing::info!(method = %req.method(), path = req.path(), "audit");
    next.run(req).await
}

async fn trace(req: Request, next: Next) -> Result<Response, RequestError> {
    let started = std::time::Instant::now();
    let res = next.run(req).await;
    tracing::debug!(elapsed = ?started.elapsed(), "handled");
    res
}

async fn request_id(req: Request, next: Next) -> Result<Response, RequestError> {
    let id = req.header("x-request-id").unwrap_or("-").to_owned();
    let res = next.run(req).await?;
    tracing::debug!(request_id = %id, status = res.code().as_u16(), "request done");
    Ok(res)
}
