//! Session tickets that tie asynchronous results to the modal that issued them.

use serde::Serialize;

/// Identifies one opening of a drawer or confirmation.
///
/// Every open issues a fresh ticket, so a gateway result that arrives after
/// the modal was closed or replaced no longer matches and is dropped.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Ticket(u64);

/// Monotonic ticket source.
#[derive(Clone, Debug, Default)]
pub(crate) struct TicketCounter {
    last: u64,
}

impl TicketCounter {
    pub(crate) const fn issue(&mut self) -> Ticket {
        self.last = self.last.wrapping_add(1);
        Ticket(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_are_unique_and_increasing() {
        let mut counter = TicketCounter::default();
        let first = counter.issue();
        let second = counter.issue();
        assert!(second > first);
    }
}
