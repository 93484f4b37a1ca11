use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::mock::http::{
    encode_chunk, find_header_end, parse_request_head, response_head, Framing, RequestHead,
    Status, CONTENT_TYPE_JSON, CONTENT_TYPE_NDJSON, LAST_CHUNK, MAX_BODY_BYTES, MAX_HEAD_BYTES,
};
use crate::mock::routes::{dispatch, JsonReply, Reply};
use crate::types::TokenStream;

/// Handle to a running mock server. The accept loop runs on a background
/// task until [`MockOllamaServer::shutdown`] is called or the handle is
/// dropped.
pub struct MockOllamaServer {
    addr: SocketAddr,
    config: Arc<ServerConfig>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    join_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MockOllamaServer {
    pub async fn start(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr(),
                source,
            })?;
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        if config.allow_cors {
            tracing::debug!("--allow-cors set; CORS headers are sent on every response regardless");
        }
        tracing::info!(
            %addr,
            allow_iframe = config.allow_iframe,
            chunk_delay_ms = config.chunk_delay.as_millis() as u64,
            "mock server listening"
        );

        let config = Arc::new(config);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(run_server(listener, config.clone(), shutdown_rx));

        Ok(Self {
            addr,
            config,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Stops accepting connections. Connections already being served run
    /// to completion on their own tasks.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        if let Ok(mut tx_opt) = self.shutdown_tx.try_lock() {
            if let Some(tx) = tx_opt.take() {
                let _ = tx.send(());
            }
        }

        if let Ok(mut handle_opt) = self.join_handle.try_lock() {
            if let Some(handle) = handle_opt.take() {
                handle.abort();
            }
        }
    }
}

async fn run_server(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                tracing::info!("mock server shutting down");
                break;
            }
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let config = config.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, config).await {
                                tracing::debug!(%peer, "connection ended early: {}", err);
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!("accept error: {}", err);
                    }
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, config: Arc<ServerConfig>) -> std::io::Result<()> {
    let (head, body) = match read_request(&mut stream).await? {
        Incoming::Request(head, body) => (head, body),
        Incoming::HeadTooLarge => {
            tracing::warn!("request head exceeds {} bytes", MAX_HEAD_BYTES);
            let reply = Reply::bad_request("Request header too large");
            send_reply(reply, &mut stream, &config).await?;
            stream.shutdown().await?;
            return discard_input(&mut stream).await;
        }
        Incoming::Closed => return Ok(()),
    };

    let path = head.path();
    let reply = if head.is_well_formed() {
        dispatch(&head.method, &path, &body)
    } else {
        Reply::bad_request("Bad request")
    };

    tracing::info!(
        method = %head.method,
        path = %path,
        status = reply.status().code(),
        origin = head.header("origin").unwrap_or("-"),
        "request"
    );

    send_reply(reply, &mut stream, &config).await?;
    stream.shutdown().await
}

enum Incoming {
    Request(RequestHead, Vec<u8>),
    HeadTooLarge,
    /// Peer closed before a full head arrived.
    Closed,
}

/// Reads one request head and up to `Content-Length` bytes of body, capped
/// at `MAX_BODY_BYTES`. The head itself may not exceed `MAX_HEAD_BYTES`.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<Incoming> {
    let mut buffer = Vec::new();
    let mut temp = [0u8; 1024];
    let mut parsed: Option<(usize, RequestHead)> = None;

    loop {
        if let Some((end, head)) = &parsed {
            if buffer.len() >= body_end(*end, head) {
                break;
            }
        }

        let n = stream.read(&mut temp).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&temp[..n]);

        if parsed.is_none() {
            match find_header_end(&buffer) {
                Some(end) if end <= MAX_HEAD_BYTES => {
                    parsed = Some((end, parse_request_head(&buffer[..end])));
                }
                Some(_) => return Ok(Incoming::HeadTooLarge),
                None if buffer.len() > MAX_HEAD_BYTES => return Ok(Incoming::HeadTooLarge),
                None => {}
            }
        }
    }

    Ok(match parsed {
        Some((end, head)) => {
            let stop = buffer.len().min(body_end(end, &head));
            let body = buffer[end..stop].to_vec();
            Incoming::Request(head, body)
        }
        None => Incoming::Closed,
    })
}

/// Reads and drops whatever the peer still sends, so closing the socket
/// doesn't reset the reply already written. Gives up after a second.
async fn discard_input(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut temp = [0u8; 1024];
    let drain = async {
        while stream.read(&mut temp).await? > 0 {}
        Ok::<(), std::io::Error>(())
    };

    match tokio::time::timeout(Duration::from_secs(1), drain).await {
        Ok(result) => result,
        Err(_) => Ok(()),
    }
}

fn body_end(head_end: usize, head: &RequestHead) -> usize {
    head_end.saturating_add(head.content_length.min(MAX_BODY_BYTES))
}

async fn send_reply(
    reply: Reply,
    stream: &mut TcpStream,
    config: &ServerConfig,
) -> std::io::Result<()> {
    match reply {
        Reply::Empty => send_empty_reply(stream, config).await,
        Reply::Json(json) => send_json_reply(json, stream, config).await,
        Reply::Stream(tokens) => send_stream_reply(tokens, stream, config).await,
    }
}

async fn send_empty_reply(stream: &mut TcpStream, config: &ServerConfig) -> std::io::Result<()> {
    let head = response_head(Status::Ok, None, Framing::Length(0), config);
    stream.write_all(head.as_bytes()).await?;
    stream.flush().await
}

async fn send_json_reply(
    reply: JsonReply,
    stream: &mut TcpStream,
    config: &ServerConfig,
) -> std::io::Result<()> {
    let body_string = reply.body.to_string();
    let head = response_head(
        reply.status,
        Some(CONTENT_TYPE_JSON),
        Framing::Length(body_string.len()),
        config,
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body_string.as_bytes()).await?;
    stream.flush().await
}

/// Writes one ndjson line per chunk, flushing each, and sleeps after every
/// word chunk. Nothing follows the done chunk except the chunked-encoding
/// terminator.
async fn send_stream_reply(
    tokens: TokenStream,
    stream: &mut TcpStream,
    config: &ServerConfig,
) -> std::io::Result<()> {
    let head = response_head(
        Status::Ok,
        Some(CONTENT_TYPE_NDJSON),
        Framing::Chunked,
        config,
    );
    stream.write_all(head.as_bytes()).await?;
    stream.flush().await?;

    for chunk in tokens {
        let line = chunk.to_line();
        stream.write_all(&encode_chunk(line.as_bytes())).await?;
        stream.flush().await?;

        if !chunk.is_done() {
            tokio::time::sleep(config.chunk_delay).await;
        }
    }

    stream.write_all(LAST_CHUNK).await?;
    stream.flush().await
}
