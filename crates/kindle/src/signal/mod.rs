//! Single-assignment readiness gate.
//!
//! A [`StartSignal`] moves through `Unstarted → Booting → Ready` exactly
//! once. Subscribers and awaiting tasks that arrive before `Ready` queue up
//! and are released in arrival order when the signal completes; each one
//! runs on its own scheduling turn rather than inline. Arrivals after
//! `Ready` are served immediately.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::LifecycleError;

/// State of a [`StartSignal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SignalState {
    /// `begin` has not been called.
    #[default]
    Unstarted,
    /// The payload is set and boot is running.
    Booting,
    /// Boot finished; waiters have been released.
    Ready,
}

type Callback<T> = Box<dyn FnOnce(T) + Send>;

/// Late subscription handed to a runtime.
///
/// Runs the callback when polled or, failing that, when dropped, so a
/// runtime that has shut down and discards the task still delivers.
struct PendingCallback<T> {
    callback: Option<Callback<T>>,
    payload: Option<T>,
}

impl<T> PendingCallback<T> {
    fn fire(&mut self) {
        if let (Some(callback), Some(payload)) = (self.callback.take(), self.payload.take()) {
            callback(payload);
        }
    }
}

impl<T> Drop for PendingCallback<T> {
    fn drop(&mut self) {
        self.fire();
    }
}

enum Waiter<T> {
    Callback(Callback<T>),
    Task(oneshot::Sender<T>),
}

struct SignalInner<T> {
    state: SignalState,
    payload: Option<T>,
    waiters: VecDeque<Waiter<T>>,
    runtime: Option<Handle>,
}

/// Shared readiness gate carrying an immutable start payload.
///
/// Clones observe the same state.
pub struct StartSignal<T> {
    inner: Arc<Mutex<SignalInner<T>>>,
}

impl<T> Clone for StartSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for StartSignal<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalInner {
                state: SignalState::Unstarted,
                payload: None,
                waiters: VecDeque::new(),
                runtime: None,
            })),
        }
    }
}

impl<T> fmt::Debug for StartSignal<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        formatter
            .debug_struct("StartSignal")
            .field("state", &inner.state)
            .field("waiters", &inner.waiters.len())
            .finish()
    }
}

impl<T> StartSignal<T> {
    /// Creates an unstarted signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SignalInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SignalState {
        self.lock().state
    }

    /// Returns `true` from `Booting` onward.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state() != SignalState::Unstarted
    }

    /// Returns `true` only once `Ready`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == SignalState::Ready
    }

    /// Number of queued waiters.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }
}

impl<T> StartSignal<T>
where
    T: Clone + Send + 'static,
{
    /// Moves `Unstarted → Booting` and stores the payload.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] on every call after the
    /// first; the stored payload is left untouched.
    pub fn begin(&self, payload: T) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state != SignalState::Unstarted {
            return Err(LifecycleError::AlreadyStarted);
        }
        inner.state = SignalState::Booting;
        inner.payload = Some(payload);
        inner.runtime = Handle::try_current().ok();
        Ok(())
    }

    /// Payload supplied to [`Self::begin`], available from `Booting` onward.
    #[must_use]
    pub fn payload(&self) -> Option<T> {
        self.lock().payload.clone()
    }

    /// Moves `Booting → Ready` and releases queued waiters in FIFO order.
    ///
    /// Each callback runs on its own task and is awaited before the next
    /// one starts, so a panicking callback cannot affect the others.
    /// Returns `false` when the signal was not booting.
    pub async fn complete(&self) -> bool {
        let (payload, waiters) = {
            let mut inner = self.lock();
            if inner.state != SignalState::Booting {
                return false;
            }
            let Some(payload) = inner.payload.clone() else {
                return false;
            };
            inner.state = SignalState::Ready;
            (payload, std::mem::take(&mut inner.waiters))
        };

        tracing::debug!(
            target: "kindle::signal",
            event = "signal_ready",
            waiters = waiters.len(),
            "start signal ready"
        );

        for waiter in waiters {
            match waiter {
                Waiter::Callback(callback) => {
                    let value = payload.clone();
                    if let Err(error) = tokio::spawn(async move { callback(value) }).await {
                        tracing::warn!(
                            target: "kindle::signal",
                            event = "subscriber_failed",
                            error = %error,
                            "start subscriber panicked"
                        );
                    }
                }
                Waiter::Task(sender) => {
                    if sender.send(payload.clone()).is_err() {
                        tracing::debug!(
                            target: "kindle::signal",
                            event = "waiter_dropped",
                            "start waiter went away before the signal fired"
                        );
                    }
                    tokio::task::yield_now().await;
                }
            }
        }
        true
    }

    /// Runs `callback` with the payload once the signal is `Ready`.
    ///
    /// Before `Ready` the callback is queued; afterwards it is scheduled on
    /// its own task straight away, preferring the caller's runtime over the
    /// one seen at [`Self::begin`]. Without a usable runtime it runs inline.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let mut inner = self.lock();
        if inner.state != SignalState::Ready {
            inner.waiters.push_back(Waiter::Callback(Box::new(callback)));
            return;
        }
        let Some(payload) = inner.payload.clone() else {
            return;
        };
        let runtime = Handle::try_current().ok().or_else(|| inner.runtime.clone());
        drop(inner);

        let mut pending = PendingCallback {
            callback: Some(Box::new(callback)),
            payload: Some(payload),
        };
        let Some(handle) = runtime else {
            pending.fire();
            return;
        };
        handle.spawn(async move { pending.fire() });
    }

    /// Waits until the signal is `Ready` and returns the payload.
    ///
    /// Returns without suspending when the signal is already `Ready`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::SignalClosed`] if the queued waiter is
    /// discarded without being released.
    pub async fn wait(&self) -> Result<T, LifecycleError> {
        let receiver = {
            let mut inner = self.lock();
            if inner.state == SignalState::Ready
                && let Some(payload) = inner.payload.clone()
            {
                return Ok(payload);
            }
            let (sender, receiver) = oneshot::channel();
            inner.waiters.push_back(Waiter::Task(sender));
            receiver
        };
        receiver.await.map_err(|_| LifecycleError::SignalClosed)
    }
}
