use std::sync::{Arc, Mutex};

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use photon::{
    Bind, BindFrom, BoxError, Controller, Field, GlobalMiddlewareEntry, HttpError, Next, Registry,
    Request, RequestError, Response, StartupError, Valid,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Validate)]
struct NewOrder {
    #[validate(length(min = 3))]
    sku: String,
    #[validate(range(min = 1, max = 10))]
    quantity: u32,
}

impl Bind for NewOrder {
    const FROM: BindFrom = BindFrom::Body;

    fn self_validate(&self) -> Result<(), BoxError> {
        if self.sku.starts_with("X-") && self.quantity > 1 {
            return Err("restricted items ship one at a time".into());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct OrderId {
    id: u64,
}

impl Bind for OrderId {
    const FROM: BindFrom = BindFrom::Path;
}

#[derive(Deserialize)]
struct Tenant {
    #[serde(rename = "x-tenant")]
    tenant: String,
}

impl Bind for Tenant {
    const FROM: BindFrom = BindFrom::Header;
}

#[derive(Serialize)]
struct Order {
    id: u64,
    sku: String,
    quantity: u32,
}

async fn create(Valid(order): Valid<NewOrder>) -> Result<Order, BoxError> {
    Ok(Order { id: 7, sku: order.sku, quantity: order.quantity })
}

async fn show(id: OrderId, tenant: Tenant) -> Result<String, HttpError> {
    if id.id == 0 {
        return Err(HttpError::new(StatusCode::NOT_FOUND, "no such order"));
    }
    Ok(format!("{}/{}", tenant.tenant, id.id))
}

type Trail = Arc<Mutex<Vec<&'static str>>>;

fn recorder(trail: Trail, label: &'static str) -> impl Fn(Request, Next) -> photon::BoxFuture + Clone {
    move |req: Request, next: Next| {
        trail.lock().unwrap().push(label);
        next.run(req)
    }
}

fn orders(trail: &Trail) -> Controller {
    Controller::new("/orders")
        .field(Field::new("Create", r#"kind:"api" method:"post" path:"/new""#).function(create))
        .field(Field::new("Show", r#"kind:"api" method:"get" path:"/{id}""#).function(show))
        .field(Field::new("Log", r#"kind:"middleware" prefix:"/""#).middleware(recorder(Arc::clone(trail), "log")))
        .field(Field::new("Auth", r#"kind:"middleware" path:"/{id}""#).middleware(recorder(Arc::clone(trail), "auth")))
}

fn registry(trail: &Trail) -> Registry {
    let mut registry = Registry::new();
    registry
        .register_controller(orders(trail))
        .register_global_middleware(GlobalMiddlewareEntry::new("/api", 20, recorder(Arc::clone(trail), "global-20")))
        .register_global_middleware(GlobalMiddlewareEntry::new("", 10, recorder(Arc::clone(trail), "global-10")))
        .register_global_middleware(GlobalMiddlewareEntry::new("/admin", 0, recorder(Arc::clone(trail), "admin")));
    registry
}

fn post_json(uri: &str, body: &'static str) -> Request {
    Request::new(Method::POST, uri.parse().unwrap())
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body(body)
}

fn get(uri: &str) -> Request {
    Request::new(Method::GET, uri.parse().unwrap())
}

#[tokio::test]
async fn mounts_controllers_under_the_context_path() {
    let trail = Trail::default();
    let router = registry(&trail).assemble("/api").unwrap();

    let res = router.dispatch(post_json("/api/orders/new", r#"{"sku":"ABC","quantity":2}"#)).await;
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(res.body().as_ref(), br#"{"id":7,"sku":"ABC","quantity":2}"#);

    let res = router.dispatch(post_json("/orders/new", r#"{"sku":"ABC","quantity":2}"#)).await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn global_middleware_runs_by_priority_then_route_middleware_in_field_order() {
    let trail = Trail::default();
    let router = registry(&trail).assemble("/api").unwrap();

    let req = get("/api/orders/3").with_header(HeaderName::from_static("x-tenant"), HeaderValue::from_static("acme"));
    let res = router.dispatch(req).await;
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(res.body().as_ref(), br#""acme/3""#);
    assert_eq!(*trail.lock().unwrap(), ["global-10", "global-20", "log", "auth"]);
}

#[tokio::test]
async fn route_middleware_only_attaches_where_its_selector_matches() {
    let trail = Trail::default();
    let router = registry(&trail).assemble("/api").unwrap();

    router.dispatch(post_json("/api/orders/new", r#"{"sku":"ABC","quantity":1}"#)).await;
    assert_eq!(*trail.lock().unwrap(), ["global-10", "global-20", "log"]);
}

#[tokio::test]
async fn invalid_parameter_never_reaches_the_function() {
    let trail = Trail::default();
    let router = registry(&trail).assemble("").unwrap();

    let res = router.dispatch(post_json("/orders/new", r#"{"sku":"AB","quantity":0}"#)).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = std::str::from_utf8(res.body()).unwrap();
    assert!(body.starts_with("[quantity]: '0' | Needs to implement 'range="), "{body}");
    assert!(body.contains("[sku]: 'AB' | Needs to implement 'length=min:3'"), "{body}");
}

#[tokio::test]
async fn self_validation_runs_after_field_rules() {
    let trail = Trail::default();
    let router = registry(&trail).assemble("").unwrap();

    let res = router.dispatch(post_json("/orders/new", r#"{"sku":"X-RAY","quantity":2}"#)).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body().as_ref(), b"restricted items ship one at a time");
}

#[tokio::test]
async fn binding_failures_and_handler_statuses_reach_the_client() {
    let trail = Trail::default();
    let router = registry(&trail).assemble("").unwrap();

    // missing x-tenant header
    let res = router.dispatch(get("/orders/3")).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);

    let req = get("/orders/0").with_header(HeaderName::from_static("x-tenant"), HeaderValue::from_static("acme"));
    let res = router.dispatch(req).await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
    assert_eq!(res.body().as_ref(), b"no such order");

    let res = router.dispatch(Request::new(Method::POST, "/orders/new".parse().unwrap()).with_body("sku=ABC")).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn global_middleware_can_short_circuit() {
    let mut registry = Registry::new();
    registry
        .register_controller(Controller::new("/orders").field(
            Field::new("Create", r#"kind:"api" method:"post" path:"/new""#).function(create),
        ))
        .register_global_middleware(GlobalMiddlewareEntry::new(
            "/orders",
            0,
            |req: Request, next: Next| async move {
                if req.header("authorization").is_none() {
                    return Ok::<_, RequestError>(Response::status(StatusCode::UNAUTHORIZED));
                }
                next.run(req).await
            },
        ));
    let router = registry.assemble("").unwrap();

    let res = router.dispatch(post_json("/orders/new", r#"{"sku":"ABC","quantity":1}"#)).await;
    assert_eq!(res.code(), StatusCode::UNAUTHORIZED);
}

#[test]
fn startup_errors_name_the_offending_field() {
    let mut registry = Registry::new();
    registry.register_controller(
        Controller::new("/orders")
            .field(Field::new("Bad", r#"kind:"api" method:"fetch" path:"/x""#).function(create)),
    );
    let err = registry.assemble("").err().unwrap();
    assert!(matches!(err, StartupError::UnknownMethod { ref field, ref method } if field == "Bad" && method == "fetch"));

    let mut registry = Registry::new();
    registry.register_controller(Controller::new("/orders/"));
    assert!(matches!(registry.assemble("").err().unwrap(), StartupError::InvalidControllerPath(_)));

    assert!(matches!(Registry::new().assemble("api").err().unwrap(), StartupError::InvalidContextPath(_)));
}

#[test]
fn assembling_twice_gives_the_same_table() {
    let trail = Trail::default();
    let registry = registry(&trail);
    assert!(registry.assemble("/api").is_ok());
    assert!(registry.assemble("/api").is_ok());
    assert_eq!(registry.controllers().len(), 1);
    assert_eq!(registry.global_middleware().len(), 3);
}
