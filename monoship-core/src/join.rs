//! Join barrier over a batch of tagged tasks.

use std::future::Future;

use tokio::task::JoinError;

/// How a spawned task settled.
#[derive(Debug)]
pub enum Settled<T> {
    /// The task ran to completion.
    Completed(T),
    /// The task panicked or was cancelled by the runtime.
    Aborted(String),
}

impl<T> Settled<T> {
    fn from_join(result: std::result::Result<T, JoinError>) -> Self {
        match result {
            Ok(value) => Settled::Completed(value),
            Err(e) if e.is_panic() => Settled::Aborted(panic_message(e)),
            Err(e) => Settled::Aborted(e.to_string()),
        }
    }
}

/// The outcome of one task, paired with the tag it was spawned under.
#[derive(Debug)]
pub struct Tagged<K, T> {
    pub tag: K,
    pub settled: Settled<T>,
}

/// Spawns every future on the runtime and waits for all of them to settle.
///
/// No task is cancelled when a sibling fails or panics. Results come back
/// in submission order, each carrying its tag.
pub async fn join_tagged<K, T, F, I>(tasks: I) -> Vec<Tagged<K, T>>
where
    I: IntoIterator<Item = (K, F)>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<(K, tokio::task::JoinHandle<T>)> = tasks
        .into_iter()
        .map(|(tag, fut)| (tag, tokio::spawn(fut)))
        .collect();

    let mut settled = Vec::with_capacity(handles.len());
    for (tag, handle) in handles {
        settled.push(Tagged {
            tag,
            settled: Settled::from_join(handle.await),
        });
    }
    settled
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
