//! Ordered per-chat dispatch.
//!
//! Every chat gets one worker task fed by an unbounded queue, so updates from
//! the same chat are handled one after another in arrival order while
//! different chats run in parallel. A worker exits once its queue is dropped;
//! [`ChatWorkers::reap`] drops the queues of idle chats.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Future returned by a [`Handler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Async handler run for each dispatched item.
pub type Handler<T> = Arc<dyn Fn(T) -> HandlerFuture + Send + Sync>;

struct ChatQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    /// Items sent but not yet fully handled.
    pending: Arc<AtomicUsize>,
}

pub struct ChatWorkers<T> {
    handler: Handler<T>,
    queues: HashMap<i64, ChatQueue<T>>,
    tasks: JoinSet<()>,
}

impl<T: Send + 'static> ChatWorkers<T> {
    pub fn new(handler: Handler<T>) -> Self {
        Self {
            handler,
            queues: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Queue `item` behind everything already dispatched for `chat_id`.
    pub fn dispatch(&mut self, chat_id: i64, item: T) {
        let item = match self.queues.get(&chat_id) {
            Some(queue) => {
                queue.pending.fetch_add(1, Ordering::SeqCst);
                match queue.tx.send(item) {
                    Ok(()) => return,
                    // Worker is gone (it panicked); start a fresh one.
                    Err(mpsc::error::SendError(item)) => {
                        queue.pending.fetch_sub(1, Ordering::SeqCst);
                        item
                    }
                }
            }
            None => item,
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let pending = Arc::new(AtomicUsize::new(1));
        let handler = self.handler.clone();
        let done = pending.clone();
        self.tasks.spawn(async move {
            handler(item).await;
            done.fetch_sub(1, Ordering::SeqCst);
            while let Some(next) = rx.recv().await {
                handler(next).await;
                done.fetch_sub(1, Ordering::SeqCst);
            }
        });
        self.queues.insert(chat_id, ChatQueue { tx, pending });
    }

    /// Release idle chats and collect finished workers.
    ///
    /// Only the dispatcher increments `pending`, so a queue seen at zero
    /// stays idle until the next `dispatch` for that chat.
    pub fn reap(&mut self) {
        self.queues.retain(|_, q| q.pending.load(Ordering::SeqCst) > 0);
        while let Some(res) = self.tasks.try_join_next() {
            log_join_error(res);
        }
    }

    /// Number of live worker tasks.
    pub fn workers(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting work and wait up to `grace` for queued items to be
    /// handled. Returns `false` if workers had to be aborted.
    pub async fn drain(mut self, grace: Duration) -> bool {
        self.queues.clear();
        let tasks = &mut self.tasks;
        let all_done = async {
            while let Some(res) = tasks.join_next().await {
                log_join_error(res);
            }
        };
        match tokio::time::timeout(grace, all_done).await {
            Ok(()) => true,
            Err(_) => {
                self.tasks.abort_all();
                false
            }
        }
    }
}

fn log_join_error(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        if e.is_panic() {
            tracing::error!(error = %e, "chat worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_handler(log: Arc<Mutex<Vec<(i64, u32)>>>) -> Handler<(i64, u32)> {
        Arc::new(move |item: (i64, u32)| -> HandlerFuture {
            let log = log.clone();
            Box::pin(async move {
                // Uneven work per item so a naive spawn would reorder.
                for _ in 0..(item.1 % 3) {
                    tokio::task::yield_now().await;
                }
                log.lock().push(item);
            })
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn items_for_one_chat_keep_arrival_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut workers = ChatWorkers::new(recording_handler(log.clone()));

        for n in 0..50u32 {
            for chat in [1i64, 2, 3] {
                workers.dispatch(chat, (chat, n));
            }
        }
        assert_eq!(workers.workers(), 3);
        assert!(workers.drain(Duration::from_secs(5)).await);

        let log = log.lock();
        assert_eq!(log.len(), 150);
        for chat in [1i64, 2, 3] {
            let seen: Vec<u32> = log.iter().filter(|(c, _)| *c == chat).map(|(_, n)| *n).collect();
            assert_eq!(seen, (0..50).collect::<Vec<_>>(), "chat {chat}");
        }
    }

    #[tokio::test]
    async fn reap_releases_idle_chats() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut workers = ChatWorkers::new(recording_handler(log.clone()));

        workers.dispatch(7, (7, 0));
        while log.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        // Let the worker get back to waiting on its queue.
        tokio::task::yield_now().await;
        workers.reap();
        assert!(workers.queues.is_empty());

        workers.dispatch(7, (7, 1));
        assert!(workers.drain(Duration::from_secs(5)).await);
        assert_eq!(*log.lock(), vec![(7, 0), (7, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_aborts_stuck_workers() {
        let handler: Handler<u32> =
            Arc::new(|_: u32| -> HandlerFuture { Box::pin(std::future::pending::<()>()) });
        let mut workers = ChatWorkers::new(handler);
        workers.dispatch(1, 0);
        assert!(!workers.drain(Duration::from_millis(50)).await);
    }
}
