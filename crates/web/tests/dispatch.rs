use std::net::SocketAddr;
use std::path::PathBuf;

use http::StatusCode;
use indoc::indoc;
use nova_web::middleware::reject;
use nova_web::router::{Router, all, get, post};
use nova_web::{Server, VerbHandler, handler_fn, middleware_fn};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }
}

#[derive(Deserialize)]
struct Login {
    user: String,
}

fn public_dir() -> PathBuf {
    let root = std::env::temp_dir().join(format!("nova-dispatch-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("site.css"), "body { margin: 0 }").unwrap();
    root
}

fn app() -> Router {
    let users = VerbHandler::new()
        .get(handler_fn(|_req, res| {
            Box::pin(async move {
                res.json(&["ada", "grace"])?;
                Ok(())
            })
        }))
        .delete(handler_fn(|_req, _res| Box::pin(async move { Err("storage offline".into()) })));

    let admin = Router::builder()
        .route(
            "/admin/stats",
            get(handler_fn(|_req, res| {
                Box::pin(async move {
                    res.text("stats");
                    Ok(())
                })
            })),
        )
        .build()
        .unwrap();

    let require_token = middleware_fn(|req, res| {
        Box::pin(async move {
            if req.header("x-token") != Some("secret") {
                reject(res, StatusCode::UNAUTHORIZED, "Unauthorized");
            }
            Ok(())
        })
    });

    Router::builder()
        .route(
            "/users/:id",
            get(handler_fn(|req, res| {
                Box::pin(async move {
                    let id = req.param("id").unwrap_or_default().to_string();
                    res.json(&serde_json::json!({ "id": id }))?;
                    Ok(())
                })
            })),
        )
        .route("/users", all(users))
        .route(
            "/old-home",
            get(handler_fn(|_req, res| {
                Box::pin(async move {
                    res.text("moved").redirect("/login");
                    Ok(())
                })
            })),
        )
        .route(
            "/login",
            post(handler_fn(|req, res| {
                Box::pin(async move {
                    let login: Login = req.form().await?;
                    res.text(format!("welcome {}", login.user));
                    Ok(())
                })
            })),
        )
        .route(
            "/echo",
            post(handler_fn(|req, res| {
                Box::pin(async move {
                    let body = req.text().await?;
                    res.text(body);
                    Ok(())
                })
            })),
        )
        .middleware("/admin", require_token)
        .mount("/admin", admin)
        .build()
        .unwrap()
}

async fn start() -> SocketAddr {
    let server = Server::builder()
        .address("127.0.0.1:0")
        .router(app())
        .max_body_size(16)
        .static_root(public_dir())
        .log_requests(false)
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));
    addr
}

async fn send(addr: SocketAddr, raw: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();

    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let mut lines = head.split("\r\n");
    let status = lines.next().unwrap().split(' ').nth(1).unwrap().parse().unwrap();
    let headers = lines
        .map(|line| {
            let (key, value) = line.split_once(':').unwrap();
            (key.trim().to_string(), value.trim().to_string())
        })
        .collect();

    Reply { status, headers, body: body.to_string() }
}

#[tokio::test]
async fn path_params_reach_the_handler() {
    let addr = start().await;
    let reply = send(addr, "GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-type"), Some("application/json"));
    assert_eq!(reply.body, r#"{"id":"42"}"#);
}

#[tokio::test]
async fn verb_without_handler_is_404() {
    let addr = start().await;
    let reply = send(addr, "POST /users HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "Not found");
}

#[tokio::test]
async fn failing_verb_is_500_and_the_server_keeps_going() {
    let addr = start().await;

    let reply = send(addr, "DELETE /users HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "Internal Server Error");

    let reply = send(addr, "GET /users HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, r#"["ada","grace"]"#);
}

#[tokio::test]
async fn redirect_drops_the_payload() {
    let addr = start().await;
    let reply = send(addr, "GET /old-home HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(reply.status, 302);
    assert_eq!(reply.header("location"), Some("/login"));
    assert_eq!(reply.body, "");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let addr = start().await;
    let request = indoc! {"
        POST /echo HTTP/1.1\r
        Host: localhost\r
        Content-Length: 32\r
        \r
        0123456789abcdef0123456789abcdef"};

    let reply = send(addr, request).await;
    assert_eq!(reply.status, 413);
}

#[tokio::test]
async fn body_within_the_limit_is_echoed() {
    let addr = start().await;
    let request = indoc! {"
        POST /echo HTTP/1.1\r
        Host: localhost\r
        Content-Length: 5\r
        \r
        hello"};

    let reply = send(addr, request).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "hello");
}

#[tokio::test]
async fn form_bodies_are_decoded() {
    let addr = start().await;
    let request = indoc! {"
        POST /login HTTP/1.1\r
        Host: localhost\r
        Content-Type: application/x-www-form-urlencoded\r
        Content-Length: 8\r
        \r
        user=ada"};

    let reply = send(addr, request).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "welcome ada");
}

#[tokio::test]
async fn middleware_guards_the_mounted_router() {
    let addr = start().await;

    let reply = send(addr, "GET /admin/stats HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(reply.status, 401);
    assert_eq!(reply.body, "Unauthorized");

    let reply = send(addr, "GET /admin/stats HTTP/1.1\r\nHost: localhost\r\nX-Token: secret\r\n\r\n").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "stats");
}

#[tokio::test]
async fn unmatched_paths_get_one_404() {
    let addr = start().await;
    let reply = send(addr, "GET /nowhere HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "Not found");
}

#[tokio::test]
async fn files_are_served_before_routing() {
    let addr = start().await;
    let reply = send(addr, "GET /site.css HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-type"), Some("text/css; charset=utf-8"));
    assert_eq!(reply.body, "body { margin: 0 }");
}

#[tokio::test]
async fn unsupported_methods_are_404() {
    let addr = start().await;
    let reply = send(addr, "OPTIONS /users HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(reply.status, 404);
}
