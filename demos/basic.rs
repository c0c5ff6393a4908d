//! Request ID middleware mounted in a plain hyper server.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/                          # fresh UUID v4
//!   curl -i -H 'x-request-id: abc' http://localhost:3000/   # echoed back
//!   curl -i http://localhost:3000/hashed                    # content hash

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use requestid::{Generator, Request, RequestId, RequestIdHandler, Response};
use tokio::net::TcpListener;
use tracing::{error, info};

struct App {
    random: RequestIdHandler,
    hashed: RequestIdHandler,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let app = Arc::new(App {
        random: RequestId::new().wrap(whoami),
        hashed: RequestId::with_generator(Generator::hash(false)).wrap(whoami),
    });

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(addr = %listener.local_addr()?, "listening");

    let mut tasks = tokio::task::JoinSet::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutting down");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let app = Arc::clone(&app);
                tasks.spawn(async move {
                    let svc = service_fn(move |req| {
                        let app = Arc::clone(&app);
                        async move { dispatch(&app, req).await }
                    });

                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    Ok(())
}

async fn dispatch(
    app: &App,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("failed to read body: {e}");
            return Ok(Response::status(http::StatusCode::BAD_REQUEST).into_http());
        }
    };
    let req = Request::from(http::Request::from_parts(parts, body));

    let handler = match req.uri().path() {
        "/hashed" => &app.hashed,
        _ => &app.random,
    };
    Ok(handler.run(req).await.into_http())
}

async fn whoami(req: Request) -> Response {
    let id = requestid::get(&req);
    info!(request_id = id, path = req.uri().path(), "handling request");
    Response::text(format!("your request id is {id}\n"))
}
