use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Lifecycle of one form's submit affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Settled,
}

/// Blocks re-entry while a submission is in flight.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    state: Arc<Mutex<SubmitState>>,
}

impl SubmitGuard {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> SubmitState { *self.state.lock() }

    /// `None` while another submission holds the ticket.
    pub fn try_begin(&self) -> Option<SubmitTicket> {
        let mut st = self.state.lock();
        if *st == SubmitState::Submitting { return None; }
        *st = SubmitState::Submitting;
        Some(SubmitTicket { state: self.state.clone() })
    }
}

/// Held for the duration of a submission; dropping it settles the guard.
#[derive(Debug)]
pub struct SubmitTicket {
    state: Arc<Mutex<SubmitState>>,
}

impl Drop for SubmitTicket {
    fn drop(&mut self) { *self.state.lock() = SubmitState::Settled; }
}

/// Guards keyed by form name and subject (normalized email).
#[derive(Debug, Clone, Default)]
pub struct SubmitGuards {
    forms: Arc<Mutex<HashMap<String, SubmitGuard>>>,
}

impl SubmitGuards {
    pub fn new() -> Self { Self::default() }

    pub fn try_begin(&self, form: &str, subject: &str) -> Option<SubmitTicket> {
        let key = format!("{}:{}", form, subject.trim().to_lowercase());
        let mut forms = self.forms.lock();
        forms.retain(|_, g| g.state() == SubmitState::Submitting);
        forms.entry(key).or_default().try_begin()
    }

    pub fn in_flight(&self) -> usize {
        self.forms.lock().values().filter(|g| g.state() == SubmitState::Submitting).count()
    }
}
