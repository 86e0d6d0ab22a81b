// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Toast controller
//
// One transient message slot per session with a debounced auto-dismiss timer.
// Every mutation goes through `Shared::apply`, which holds the slot lock for
// the whole transition, so callers and the timer are serialized.

pub mod banner;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use banner::{BannerAction, ToastBanner};

/// Lifetime of a toast when neither the caller nor the settings say otherwise
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

/// Deadline used when `now + duration` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Classification of a toast, drives presentation styling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Success,
    Warning,
    Error,
}

/// Snapshot of the toast slot
///
/// `message` and `severity` survive a hide so exit animations can keep
/// drawing the last toast while it slides out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastState {
    pub visible: bool,
    pub message: String,
    /// `None` until the first toast is shown
    pub severity: Option<Severity>,
}

/// Per-call options for [`ToastController::show_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToastOptions {
    pub severity: Severity,
    /// `None` (or zero) uses the controller's default duration
    pub duration: Option<Duration>,
}

impl ToastOptions {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            duration: None,
        }
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Transitions of the slot state machine
#[derive(Debug)]
enum ToastEvent {
    Show {
        message: String,
        severity: Severity,
        duration: Duration,
    },
    Hide,
    /// Posted by a dismissal timer when its sleep completes
    Expired { ticket: u64 },
}

struct Slot {
    state: ToastState,
    /// Identifies the most recently armed timer
    ticket: u64,
    timer: Option<JoinHandle<()>>,
}

impl Slot {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    slot: Mutex<Slot>,
    state_tx: watch::Sender<ToastState>,
    runtime: Handle,
    default_duration: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(self: &Arc<Self>, event: ToastEvent) {
        let mut slot = self.lock();

        match event {
            ToastEvent::Show {
                message,
                severity,
                duration,
            } => {
                slot.disarm();
                let ticket = slot.ticket.wrapping_add(1);
                slot.ticket = ticket;
                tracing::debug!(
                    "Showing {:?} toast for {:?} (ticket {})",
                    severity,
                    duration,
                    ticket
                );

                slot.state = ToastState {
                    visible: true,
                    message,
                    severity: Some(severity),
                };
                slot.timer = Some(self.arm(ticket, duration));
            }
            ToastEvent::Hide => {
                slot.disarm();
                slot.state.visible = false;
            }
            ToastEvent::Expired { ticket } => {
                // A timer that lost the race against a newer show or a hide
                if ticket != slot.ticket || slot.timer.is_none() {
                    tracing::debug!("Ignoring stale toast timer (ticket {})", ticket);
                    return;
                }
                tracing::debug!("Toast timer fired (ticket {})", ticket);
                slot.timer = None;
                slot.state.visible = false;
            }
        }

        let state = slot.state.clone();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn arm(self: &Arc<Self>, ticket: u64, duration: Duration) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(self);
        // Count from the call to show, not from the task's first poll
        let now = tokio::time::Instant::now();
        let deadline = now
            .checked_add(duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(shared) = shared.upgrade() {
                shared.apply(ToastEvent::Expired { ticket });
            }
        })
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if slot.timer.is_some() {
            tracing::debug!("Toast controller dropped, cancelling dismissal timer");
        }
        slot.disarm();
    }
}

/// Owner of the session's toast slot
///
/// Clones share the same slot. The armed timer is cancelled when the last
/// clone is dropped.
#[derive(Clone)]
pub struct ToastController {
    shared: Arc<Shared>,
}

impl ToastController {
    /// Create a controller whose timers run on `runtime`
    ///
    /// Subscribers only ever see the state left after a synchronous burst of
    /// calls (`show` then `hide` never renders) when the callers and the
    /// renderers share one thread: a current-thread runtime, or a `LocalSet`
    /// on a multi-thread one. A renderer on another worker thread can read
    /// the state between two calls.
    pub fn new(runtime: Handle) -> Self {
        Self::with_default_duration(runtime, DEFAULT_TOAST_DURATION)
    }

    /// Create a controller with a custom default toast lifetime
    ///
    /// A zero default is replaced by [`DEFAULT_TOAST_DURATION`].
    pub fn with_default_duration(runtime: Handle, default_duration: Duration) -> Self {
        let (state_tx, _) = watch::channel(ToastState::default());
        let default_duration = positive_or(default_duration, DEFAULT_TOAST_DURATION);

        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: ToastState::default(),
                    ticket: 0,
                    timer: None,
                }),
                state_tx,
                runtime,
                default_duration,
            }),
        }
    }

    /// Show a success toast for the default duration
    pub fn show(&self, message: impl Into<String>) {
        self.show_with(message, ToastOptions::default());
    }

    /// Show a toast, replacing whatever is on screen and restarting the countdown
    pub fn show_with(&self, message: impl Into<String>, options: ToastOptions) {
        let default = self.shared.default_duration;
        self.shared.apply(ToastEvent::Show {
            message: message.into(),
            severity: options.severity,
            duration: positive_or(options.duration.unwrap_or(default), default),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show_with(message, ToastOptions::new(Severity::Success));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.show_with(message, ToastOptions::new(Severity::Warning));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show_with(message, ToastOptions::new(Severity::Error));
    }

    /// Hide the current toast immediately. No-op when already hidden.
    pub fn hide(&self) {
        self.shared.apply(ToastEvent::Hide);
    }

    /// Current contents of the slot
    pub fn current_state(&self) -> ToastState {
        self.shared.lock().state.clone()
    }

    /// Observe slot changes; bursts of calls coalesce into the latest state
    pub fn subscribe(&self) -> watch::Receiver<ToastState> {
        self.shared.state_tx.subscribe()
    }

    /// Lifetime used when a caller does not pass one
    pub fn default_duration(&self) -> Duration {
        self.shared.default_duration
    }

    /// Whether a dismissal timer is currently armed
    pub fn timer_armed(&self) -> bool {
        self.shared.lock().timer.is_some()
    }
}

fn positive_or(duration: Duration, fallback: Duration) -> Duration {
    if duration.is_zero() {
        fallback
    } else {
        duration
    }
}

impl std::fmt::Debug for ToastController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastController")
            .field("state", &self.current_state())
            .field("default_duration", &self.shared.default_duration)
            .finish()
    }
}
