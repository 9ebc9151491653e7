//! Development server with live reload
//!
//! Serves the output directory, recompiles on change and tells connected
//! pages to reload over a WebSocket. [`DevServer::start`] returns a
//! [`ServerHandle`]; the server runs until [`ServerHandle::shutdown`] is
//! called or the handle's signal future resolves.

mod live_reload;
mod signal;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use colored::Colorize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info};

use crate::compiler::Compiler;

pub use live_reload::{ReloadMessage, LIVE_RELOAD_PATH};
pub use signal::shutdown_signal;

/// First port tried when none is given
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable with the number of extra ports to try
pub const PORT_RETRY_ENV: &str = "DEFAULT_PORT_RETRY";

const DEFAULT_PORT_RETRY: u16 = 3;

/// Largest HTML page the live-reload client is injected into
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DevServerOptions {
    pub host: String,

    /// Fixed port; `None` picks the first free one from [`DEFAULT_PORT`]
    pub port: Option<u16>,

    /// Open the browser once listening
    pub open: bool,

    pub live_reload: bool,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            open: false,
            live_reload: true,
        }
    }
}

/// Shared server state
struct ServerState {
    reload_tx: broadcast::Sender<ReloadMessage>,
    live_reload: bool,
}

pub struct DevServer {
    compiler: Arc<Compiler>,
    options: DevServerOptions,
}

impl DevServer {
    pub fn new(compiler: Arc<Compiler>, options: DevServerOptions) -> Self {
        Self { compiler, options }
    }

    /// Bind, start serving and start the watch loop
    pub async fn start(self) -> Result<ServerHandle> {
        let listener = match self.options.port {
            Some(port) => TcpListener::bind((self.options.host.as_str(), port))
                .await
                .with_context(|| format!("Failed to listen on {}:{}", self.options.host, port))?,
            None => bind_free_port(&self.options.host, DEFAULT_PORT, port_retry()).await?,
        };
        let addr = listener.local_addr()?;

        let (reload_tx, _) = broadcast::channel::<ReloadMessage>(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(ServerState {
            reload_tx: reload_tx.clone(),
            live_reload: self.options.live_reload,
        });
        let app = router(&self.compiler.config().output_dir(), state);

        let server = tokio::spawn({
            let shutdown_rx = shutdown_rx.clone();
            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(stopped(shutdown_rx))
                    .await
                    .context("Server error")
            }
        });

        let watcher = tokio::spawn({
            let compiler = self.compiler.clone();
            async move {
                compiler
                    .watch(
                        move |stats| {
                            // No receivers just means no page is open
                            let _ = reload_tx.send(ReloadMessage::from_stats(stats));
                        },
                        stopped(shutdown_rx),
                    )
                    .await
            }
        });

        let url = format!("http://{}", addr);
        info!("Server listening on {}", url);
        eprintln!("  {} Local: {}\n", "➜".green(), url.cyan());

        if self.options.open {
            if let Err(e) = webbrowser_open(&url) {
                debug!("Failed to open browser: {}", e);
            }
        }

        Ok(ServerHandle {
            addr,
            shutdown_tx,
            server,
            watcher,
        })
    }
}

/// Owner of a running dev server
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<Result<()>>,
    watcher: JoinHandle<Result<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Ask the server and the watch loop to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for both tasks to finish
    pub async fn wait(self) -> Result<()> {
        let server = self.server.await;
        // The watch loop must not outlive a failed server
        let _ = self.shutdown_tx.send(true);
        let watcher = self.watcher.await;

        server??;
        watcher??;
        Ok(())
    }

    /// Run until `signal` resolves or the server fails, then shut down
    pub async fn run_until<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = signal => {
                debug!("Shutting down dev server");
            }
            result = &mut self.server => {
                self.shutdown();
                let _ = self.watcher.await;
                return result?;
            }
        }

        self.shutdown();
        self.wait().await
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn router(output_dir: &Path, state: Arc<ServerState>) -> Router {
    let files = ServeDir::new(output_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(output_dir.join("index.html")));

    Router::new()
        .route(LIVE_RELOAD_PATH, get(live_reload::websocket))
        .fallback_service(files)
        .layer(middleware::from_fn_with_state(state.clone(), inject_client_script))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Add the live-reload client to HTML responses
async fn inject_client_script(
    State(state): State<Arc<ServerState>>,
    req: Request,
    next: Next,
) -> Response {
    let res = next.run(req).await;
    if !state.live_reload {
        return res;
    }

    let is_html = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if !is_html {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let bytes = match to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read HTML response: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let html = live_reload::inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

fn port_retry() -> u16 {
    std::env::var(PORT_RETRY_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT_RETRY)
}

/// Bind the first free port in `start..=start + retries`
async fn bind_free_port(host: &str, start: u16, retries: u16) -> Result<TcpListener> {
    let last = start.saturating_add(retries);

    for port in start..=last {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!("Port {} is in use", port);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to listen on {}:{}", host, port))
            }
        }
    }

    bail!("No free port between {} and {} on {}", start, last, host)
}

/// Open URL in browser
fn webbrowser_open(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::bundler::{Bundler, BundlerConfig, CompileStats, Mode};
    use crate::compiler::CompilerOptions;
    use crate::config::Config;

    struct NoopBundler;

    #[async_trait]
    impl Bundler for NoopBundler {
        fn name(&self) -> &str {
            "noop"
        }

        async fn compile(&self, config: &BundlerConfig) -> Result<CompileStats> {
            Ok(CompileStats::new(config.mode, vec![], vec![], vec![], Duration::ZERO))
        }
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_bind_skips_ports_in_use() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind_free_port("127.0.0.1", port, 3).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_bind_gives_up_after_retries() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        assert!(bind_free_port("127.0.0.1", port, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_serves_output_with_live_reload_client() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(
            dir.path().join("public/index.html"),
            "<html><body><h1>hi</h1></body></html>",
        )
        .unwrap();

        let mut config = Config {
            output_path: "dist".to_string(),
            root: dir.path().to_path_buf(),
            ..Config::default()
        };
        config
            .copies
            .insert("index.html".to_string(), "public/index.html".to_string());

        let compiler = Arc::new(Compiler::new(
            config,
            CompilerOptions {
                mode: Mode::Development,
                json: false,
                progress: false,
                merge: None,
            },
            Arc::new(NoopBundler),
        ));
        let options = DevServerOptions {
            host: "127.0.0.1".to_string(),
            port: Some(0),
            ..DevServerOptions::default()
        };

        let handle = DevServer::new(compiler, options).start().await.unwrap();

        let index = dir.path().join("dist/index.html");
        for _ in 0..100 {
            if index.is_file() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let response = get(handle.addr(), "/").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>hi</h1>"));
        assert!(response.contains(LIVE_RELOAD_PATH));

        let missing = get(handle.addr(), "/some/route").await;
        assert!(missing.contains("<h1>hi</h1>"));

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(10), handle.wait())
            .await
            .unwrap()
            .unwrap();
    }
}
