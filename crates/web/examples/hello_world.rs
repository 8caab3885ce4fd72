use nova_web::router::{Router, get};
use nova_web::{Server, handler_fn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = Router::builder()
        .route(
            "/",
            get(handler_fn(|_req, res| {
                Box::pin(async move {
                    res.text("hello world");
                    Ok(())
                })
            })),
        )
        .build()?;

    Server::builder().address("127.0.0.1:3000").router(router).build()?.start().await?;
    Ok(())
}
