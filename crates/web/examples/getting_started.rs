use http::StatusCode;
use nova_web::middleware::reject;
use nova_web::router::{Router, all, get, post};
use nova_web::{Server, StaticFile, VerbHandler, handler_fn, middleware_fn};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct User {
    name: String,
    zip: String,
}

// curl -v -H 'Content-Type: application/json' -d '{"name":"hello","zip":"world"}' http://127.0.0.1:8080/users
fn users() -> VerbHandler {
    VerbHandler::new()
        .get(handler_fn(|_req, res| {
            Box::pin(async move {
                res.json(&[User { name: "ada".into(), zip: "10115".into() }])?;
                Ok(())
            })
        }))
        .post(handler_fn(|req, res| {
            Box::pin(async move {
                let user: User = req.json().await?;
                res.status(StatusCode::CREATED).json(&user)?;
                Ok(())
            })
        }))
}

// curl -v -H 'X-Api-Key: secret' http://127.0.0.1:8080/api/users/42?fields=name
fn api() -> Router {
    let require_key = middleware_fn(|req, res| {
        Box::pin(async move {
            if req.header("x-api-key") != Some("secret") {
                reject(res, StatusCode::UNAUTHORIZED, "missing api key");
            }
            Ok(())
        })
    });

    Router::builder()
        .middleware("/api", require_key)
        .route(
            "/api/users/:id",
            get(handler_fn(|req, res| {
                Box::pin(async move {
                    let id = req.param("id").unwrap_or_default().to_string();
                    let fields = req.query_param("fields");
                    res.json(&serde_json::json!({ "id": id, "fields": fields }))?;
                    Ok(())
                })
            })),
        )
        .build()
        .unwrap()
}

// curl -v -d "name=hello&zip=world" -H 'Content-Type: application/x-www-form-urlencoded' http://127.0.0.1:8080/signup
#[tokio::main]
async fn main() {
    let router = Router::builder()
        .mount("/api", api())
        .route("/users", all(users()))
        .route(
            "/signup",
            post(handler_fn(|req, res| {
                Box::pin(async move {
                    let user: User = req.form().await?;
                    res.text(format!("welcome {}, zip {}\r\n", user.name, user.zip));
                    Ok(())
                })
            })),
        )
        .route(
            "/home",
            get(handler_fn(|_req, res| {
                Box::pin(async move {
                    res.redirect("/");
                    Ok(())
                })
            })),
        )
        .route("/", get(StaticFile::new("/index.html")))
        .build()
        .unwrap();

    let server = Server::builder()
        .address("127.0.0.1:8080")
        .router(router)
        .max_body_size(64 * 1024)
        .static_root("public")
        .build()
        .unwrap();

    if let Err(e) = server.start().await {
        eprintln!("server stopped: {e}");
    }
}
