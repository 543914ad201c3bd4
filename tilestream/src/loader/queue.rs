//! Blocking FIFO of load requests.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use super::request::LoadRequest;

/// How often a blocked worker re-checks for shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// FIFO shared between the render thread and the loader workers.
#[derive(Debug, Default)]
pub struct LoadQueue {
    items: Mutex<VecDeque<LoadRequest>>,
    ready: Condvar,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and wake one waiting worker.
    pub fn push(&self, request: LoadRequest) {
        self.items.lock().push_back(request);
        self.ready.notify_one();
    }

    /// Take the oldest request without waiting.
    pub fn try_pop(&self) -> Option<LoadRequest> {
        self.items.lock().pop_front()
    }

    /// Block until a request is available or `token` is cancelled.
    pub fn pop_blocking(&self, token: &CancellationToken) -> Option<LoadRequest> {
        let mut items = self.items.lock();
        loop {
            if token.is_cancelled() {
                return None;
            }
            if let Some(request) = items.pop_front() {
                return Some(request);
            }
            self.ready.wait_for(&mut items, SHUTDOWN_POLL);
        }
    }

    /// Wake every blocked worker so it notices cancellation.
    pub fn wake_all(&self) {
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucket;
    use crate::loader::request::TileLoad;
    use crate::tile::LoadTicket;
    use std::sync::Arc;
    use std::thread;

    fn request(x: u8) -> LoadRequest {
        LoadRequest::Tile(TileLoad {
            bucket: Bucket::from_parts(0, 0, x, 0),
            generation: x as u64,
            ticket: LoadTicket::new(),
        })
    }

    #[test]
    fn test_fifo_order() {
        let queue = LoadQueue::new();
        queue.push(request(1));
        queue.push(request(2));
        queue.push(request(3));

        assert_eq!(queue.len(), 3);
        let order: Vec<u8> = std::iter::from_fn(|| queue.try_pop())
            .map(|r| r.bucket().x())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_blocking_wakes_on_push() {
        let queue = Arc::new(LoadQueue::new());
        let token = CancellationToken::new();

        let worker = {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            thread::spawn(move || queue.pop_blocking(&token).map(|r| r.bucket().x()))
        };

        thread::sleep(Duration::from_millis(20));
        queue.push(request(5));
        assert_eq!(worker.join().unwrap(), Some(5));
    }

    #[test]
    fn test_pop_blocking_returns_on_cancel() {
        let queue = Arc::new(LoadQueue::new());
        let token = CancellationToken::new();

        let worker = {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            thread::spawn(move || queue.pop_blocking(&token).is_none())
        };

        token.cancel();
        queue.wake_all();
        assert!(worker.join().unwrap());
    }
}
