//! Minimal tsu-log example: JSON access logs for a couple of routes.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/
//!   curl http://localhost:8080/users/42
//!   curl -X POST http://localhost:8080/users -d '{"name":"alice"}'
//!   curl http://localhost:8080/missing        (404, not logged: no route)
//!
//! Every routed request prints one line like:
//!   {"level":"INFO","fields":{"message":"completed handling request","status":200,
//!    "method":"GET","request":"/","remote":"127.0.0.1:52114","duration":41.3,
//!    "size":12,"referer":"","user-agent":"curl/8.5.0","name":"example",
//!    "component":"homepage"},...}

use std::io::Write;

use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, StatusCode};
use tracing::level_filters::LevelFilter;
use tsu_log::middleware::Logging;
use tsu_log::{Request, ResponseWriter, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_max_level(LevelFilter::INFO)
        .init();

    let logging = Logging::new().name("example");

    let app = Router::new()
        .get("/",           logging.wrap(home, "homepage"))
        .get("/users/{id}", logging.wrap(get_user, "users"))
        .post("/users",     logging.wrap(create_user, "users"));

    Server::bind("0.0.0.0:8080")
        .expect("valid address")
        .serve(app)
        .await
        .expect("server error");
}

// GET /
fn home(w: &mut dyn ResponseWriter, _req: &Request) {
    w.set_status(StatusCode::OK);
    let _ = w.write_all(b"hello world\n");
}

// GET /users/{id}
fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
    let id = req.param("id").unwrap_or("unknown");
    w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let _ = write!(w, r#"{{"id":"{id}","name":"alice"}}"#);
}

// POST /users
fn create_user(w: &mut dyn ResponseWriter, req: &Request) {
    if req.body().is_empty() {
        w.set_status(StatusCode::BAD_REQUEST);
        return;
    }

    w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    w.headers_mut().insert(LOCATION, HeaderValue::from_static("/users/99"));
    w.set_status(StatusCode::CREATED);
    let _ = w.write_all(br#"{"id":"99","name":"new_user"}"#);
}
