//! Local report viewer
//!
//! Serves the rendered report over HTTP. Every request rebuilds the report
//! from a fresh repository instance, so the per-instance cache is never
//! shared across concurrent builds.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};

use crate::{render, report};

/// Bind and serve until the process is interrupted.
pub async fn serve(addr: SocketAddr, capture_root: PathBuf) -> Result<()> {
    let make_service = make_service_fn(move |_| {
        let root = capture_root.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |_req: Request<Body>| {
                let root = root.clone();
                async move { Ok::<_, Infallible>(handle(root).await) }
            }))
        }
    });

    tracing::info!("serving report on http://{addr}/");
    Server::try_bind(&addr)
        .map_err(|err| anyhow!("failed to bind {addr}: {err}"))?
        .serve(make_service)
        .await?;
    Ok(())
}

/// Build and render the report; report building is blocking file I/O, so it
/// runs off the async threads.
async fn handle(root: PathBuf) -> Response<Body> {
    let page = tokio::task::spawn_blocking(move || -> Result<String> {
        let report = report::build(&root)?;
        render::render_index(&report)
    })
    .await;

    let response = match page {
        Ok(Ok(html)) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(Body::from(html)),
        Ok(Err(err)) => {
            tracing::error!("unable to build report: {err:#}");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from(format!("unable to build report: {err:#}")))
        }
        Err(err) => {
            tracing::error!("report task failed: {err}");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("unable to build report"))
        }
    };
    response.expect("valid HTTP response")
}
