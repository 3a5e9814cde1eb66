//! Deferred-completion handles for host events.
//!
//! Each entry point receives an event carrying a [`Completion`]; the host keeps
//! the matching [`Pending`] and awaits it to learn when the work finished and
//! whether it succeeded. Dropping a completion without resolving it resolves
//! the pending side as abandoned.

use std::future::Future;

use tokio::sync::oneshot;

use crate::error::{LifecycleError, RequestError};
use crate::http::{Request, Response};

/// Value a [`Pending`] resolves to when its work was dropped unfinished.
pub trait Abandon {
    fn abandoned() -> Self;
}

impl Abandon for Result<(), LifecycleError> {
    fn abandoned() -> Self {
        Err(LifecycleError::Abandoned)
    }
}

impl Abandon for Result<Response, RequestError> {
    fn abandoned() -> Self {
        Err(RequestError::Abandoned)
    }
}

/// Producer side: resolves exactly once.
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completion<T> {
    pub fn complete(self, value: T) {
        // The host may have stopped waiting; the outcome is then unobserved.
        let _ = self.tx.send(value);
    }
}

/// Host side: awaits the outcome.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T: Abandon> Pending<T> {
    pub async fn wait(self) -> T {
        self.rx.await.unwrap_or_else(|_| T::abandoned())
    }
}

pub fn deferred<T>() -> (Completion<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, Pending { rx })
}

/// Install or activate event.
#[derive(Debug)]
pub struct LifecycleEvent {
    done: Completion<Result<(), LifecycleError>>,
}

impl LifecycleEvent {
    pub fn new() -> (Self, Pending<Result<(), LifecycleError>>) {
        let (done, pending) = deferred();
        (Self { done }, pending)
    }

    /// Run `work` as its own task and resolve the event with its outcome.
    pub fn wait_until<F>(self, work: F)
    where
        F: Future<Output = Result<(), LifecycleError>> + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = work.await;
            self.done.complete(outcome);
        });
    }
}

/// A request event awaiting its response.
#[derive(Debug)]
pub struct FetchEvent {
    request: Request,
    done: Completion<Result<Response, RequestError>>,
}

impl FetchEvent {
    pub fn new(request: Request) -> (Self, Pending<Result<Response, RequestError>>) {
        let (done, pending) = deferred();
        (Self { request, done }, pending)
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Run `respond` on the request as its own task and deliver its outcome.
    pub fn respond_with<F, Fut>(self, respond: F)
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response, RequestError>> + Send + 'static,
    {
        let work = respond(self.request);
        let done = self.done;
        tokio::spawn(async move {
            done.complete(work.await);
        });
    }
}
