//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use request_interceptor::cache::{Bucket, BucketStore, MemoryStore};
use request_interceptor::error::{ClaimError, NetworkError, StoreError};
use request_interceptor::http::{Request, RequestKey, Response};
use request_interceptor::net::{ClientRegistry, NetworkTransport};

pub fn url(path: &str) -> Url {
    Url::parse("http://localhost/").unwrap().join(path).unwrap()
}

/// Network double: fixed responses per path, failures on demand, and a log
/// of every request it saw.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    seen: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, response: Response) {
        self.responses.lock().unwrap().insert(path.to_string(), response);
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn seen(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_paths(&self) -> Vec<String> {
        self.seen().iter().map(|r| r.path().to_string()).collect()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }

    /// What the transport answers for `path`, without recording it.
    pub fn expected(&self, path: &str) -> Response {
        self.responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| {
                Response::ok(format!("live {}", path)).with_header("x-origin", "mock")
            })
    }
}

#[async_trait]
impl NetworkTransport for MockTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.seen.lock().unwrap().push(request.clone());
        if self.failing.lock().unwrap().contains(request.path()) {
            return Err(NetworkError::Transport(format!("{} unreachable", request.path())));
        }
        Ok(self.expected(request.path()))
    }
}

/// Bucket store whose deletes and writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    undeletable: Mutex<HashSet<String>>,
    fail_writes: Arc<AtomicBool>,
    fail_listing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn refuse_delete(&self, name: &str) {
        self.undeletable.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

struct FlakyBucket {
    inner: Arc<dyn Bucket>,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl Bucket for FlakyBucket {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.put(key, response).await
    }

    async fn put_all(&self, entries: Vec<(RequestKey, Response)>) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.put_all(entries).await
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<Response>, StoreError> {
        self.inner.get(key).await
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StoreError> {
        self.inner.keys().await
    }
}

#[async_trait]
impl BucketStore for FlakyStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StoreError> {
        let inner = self.inner.open(name).await?;
        Ok(Arc::new(FlakyBucket {
            inner,
            fail_writes: self.fail_writes.clone(),
        }))
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, StoreError> {
        self.inner.lookup(name, key).await
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        if self.undeletable.lock().unwrap().contains(name) {
            return Err(StoreError::Backend(format!("{} is locked", name)));
        }
        self.inner.delete(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("listing unavailable".into()));
        }
        self.inner.list_names().await
    }
}

/// Client registry that refuses every claim.
pub struct FailingClients;

#[async_trait]
impl ClientRegistry for FailingClients {
    async fn claim_all(&self, _version: &str) -> Result<usize, ClaimError> {
        Err(ClaimError("clients unavailable".into()))
    }
}

/// Start a programmable origin on an ephemeral port.
///
/// `f` receives the request path and returns status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let mut read = 0;
                        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf[read..]).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => read += n,
                            }
                            if read == buf.len() {
                                return;
                            }
                        }
                        let head = String::from_utf8_lossy(&buf[..read]);
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Origin: backend\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A free local address for the interceptor under test.
pub async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
