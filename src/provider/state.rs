//! Mutable provider state guarded by the provider's lock

use crate::backoff::Backoff;
use crate::scraping::RawRepository;

/// Consumer verdict on the last delivered repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Processed; never deliver it again
    Success,
    /// Not processed; deliver it again on the next pull
    Failure,
}

impl<E> From<&Result<(), E>> for Ack {
    fn from(outcome: &Result<(), E>) -> Self {
        match outcome {
            Ok(()) => Ack::Success,
            Err(_) => Ack::Failure,
        }
    }
}

/// The at-most-one delivered item
#[derive(Debug, Clone, Default)]
pub(super) enum Slot {
    #[default]
    Idle,
    /// Returned by `next` and awaiting an ack
    Pending(RawRepository),
    /// Negatively acknowledged; the next pull returns it
    Replay(RawRepository),
}

impl Slot {
    /// The item to hand out again, if any; moves the slot to `Pending`
    pub(super) fn take_for_delivery(&mut self) -> Option<RawRepository> {
        match std::mem::take(self) {
            Slot::Idle => None,
            Slot::Pending(item) | Slot::Replay(item) => {
                *self = Slot::Pending(item.clone());
                Some(item)
            }
        }
    }
}

pub(super) struct ProviderState<T> {
    pub(super) roster: Vec<T>,
    pub(super) current: usize,
    pub(super) slot: Slot,
    pub(super) backoff: Backoff,
}

impl<T> ProviderState<T> {
    pub(super) fn new(backoff: Backoff) -> Self {
        Self {
            roster: Vec::new(),
            current: 0,
            slot: Slot::Idle,
            backoff,
        }
    }

    /// Removes a scraper; the cursor stays on the slot that shifted into its place
    pub(super) fn remove(&mut self, index: usize) -> T {
        let scraper = self.roster.remove(index);
        if self.current >= self.roster.len() {
            self.current = 0;
        }
        scraper
    }
}
