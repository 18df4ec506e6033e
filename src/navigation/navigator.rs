use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct NavState {
    generation: u64,
    path: String,
}

/// Current route plus a generation counter bumped on every navigation.
///
/// Requests started through [`Navigator::scoped`] are abandoned when the route
/// changes before they finish, so a slow response never lands on a newer screen.
#[derive(Debug, Clone)]
pub struct Navigator {
    tx: Arc<watch::Sender<NavState>>,
}

impl Navigator {
    pub fn new(initial: &str) -> Self {
        let (tx, _rx) = watch::channel(NavState { generation: 0, path: initial.to_string() });
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> String { self.tx.borrow().path.clone() }

    pub fn generation(&self) -> u64 { self.tx.borrow().generation }

    /// Record a navigation and return its generation.
    pub fn go(&self, path: &str) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|s| {
            s.generation += 1;
            s.path = path.to_string();
            generation = s.generation;
        });
        debug!(target: "lendportal::nav", "nav.go path={} generation={}", path, generation);
        generation
    }

    /// Run `fut` unless a navigation happens first.
    pub async fn scoped<F, T>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let mut rx = self.tx.subscribe();
        let started = rx.borrow_and_update().generation;
        let superseded = async move {
            loop {
                if rx.changed().await.is_err() {
                    // sender gone: nothing can supersede us any more
                    std::future::pending::<()>().await;
                }
                if rx.borrow_and_update().generation != started {
                    return;
                }
            }
        };
        tokio::select! {
            out = fut => out,
            _ = superseded => Err(AppError::cancelled(
                "navigation_superseded".to_string(),
                format!("route changed to {} before the response arrived", self.current()),
            )),
        }
    }
}
