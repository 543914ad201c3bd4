//! Per-frame attach permit.
//!
//! A threaded loader may only hand a finished tile to the render thread
//! after taking a permit, and the render thread releases one permit per
//! frame. A permit is granted only to a worker that is already waiting, so
//! frames without a finished tile do not bank permits for later.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct PermitState {
    waiting: usize,
    granted: usize,
}

#[derive(Debug, Default)]
pub struct FramePermit {
    state: Mutex<PermitState>,
    granted: Condvar,
}

impl FramePermit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant one permit to a waiting worker.
    ///
    /// Returns `false`, granting nothing, when no worker is waiting for one.
    pub fn release(&self) -> bool {
        let mut state = self.state.lock();
        if state.waiting <= state.granted {
            return false;
        }
        state.granted += 1;
        drop(state);
        self.granted.notify_one();
        true
    }

    /// Wait for a permit. Returns `false` if `token` was cancelled first.
    pub fn acquire(&self, token: &CancellationToken) -> bool {
        let mut state = self.state.lock();
        state.waiting += 1;
        loop {
            if state.granted > 0 {
                state.granted -= 1;
                state.waiting -= 1;
                return true;
            }
            if token.is_cancelled() {
                state.waiting -= 1;
                return false;
            }
            self.granted.wait_for(&mut state, SHUTDOWN_POLL);
        }
    }

    /// Workers currently blocked waiting for a permit.
    pub fn waiting(&self) -> usize {
        let state = self.state.lock();
        state.waiting - state.granted
    }

    pub fn wake_all(&self) {
        self.granted.notify_all();
    }
}
