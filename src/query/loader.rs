//! Background snapshot loading with stale-response discard.
//!
//! Every request gets a ticket from a monotonically increasing sequence. Responses travel
//! back over a channel and are applied only when they carry the most recently issued
//! ticket, so a slow old query can never overwrite the result of a newer one.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::graph_utils::error::Result;
use crate::graph_utils::graph::{lock_store, SharedStore};
use crate::graph_utils::model::{EntryFilter, OwnerId};

use super::engine::{GraphSnapshot, QueryEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: u64,
    settled: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// True when `ticket` is the newest issued one and has not been accepted yet.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        if ticket.0 == self.issued && ticket.0 > self.settled {
            self.settled = ticket.0;
            true
        } else {
            false
        }
    }

    /// A request is in flight until the newest ticket has been accepted.
    pub fn is_pending(&self) -> bool {
        self.issued > self.settled
    }

    /// Retire every outstanding ticket; responses already in flight are discarded.
    pub fn invalidate(&mut self) {
        self.issued += 1;
        self.settled = self.issued;
    }

    pub fn latest(&self) -> Option<Ticket> {
        (self.issued > 0).then_some(Ticket(self.issued))
    }
}

type Response = (Ticket, Result<GraphSnapshot>);

pub struct QueryLoader {
    tx: Sender<Response>,
    rx: Receiver<Response>,
    sequencer: RequestSequencer,
}

impl Default for QueryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, sequencer: RequestSequencer::new() }
    }

    /// Run the query on a worker thread. Supersedes any request still in flight.
    pub fn request(&mut self, store: SharedStore, owner: OwnerId, filter: EntryFilter) -> Ticket {
        let ticket = self.sequencer.issue();
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = lock_store(&store).and_then(|s| QueryEngine::snapshot(&s, owner, &filter));
            // Receiver gone means the UI is shutting down.
            let _ = tx.send((ticket, result));
        });
        ticket
    }

    /// Hand a response in directly; used by callers that already hold a result.
    pub fn deliver(&self, ticket: Ticket, result: Result<GraphSnapshot>) {
        let _ = self.tx.send((ticket, result));
    }

    pub fn issue(&mut self) -> Ticket {
        self.sequencer.issue()
    }

    /// Drain finished requests; returns the newest accepted result, if any arrived.
    pub fn poll(&mut self) -> Option<Result<GraphSnapshot>> {
        let mut applied = None;
        while let Ok((ticket, result)) = self.rx.try_recv() {
            if self.sequencer.accept(ticket) {
                applied = Some(result);
            } else {
                log::debug!("discarding stale graph query result {:?}", ticket);
            }
        }
        applied
    }

    /// Drop interest in every request issued so far, e.g. when the session changes.
    pub fn invalidate(&mut self) {
        self.sequencer.invalidate();
    }

    pub fn is_loading(&self) -> bool {
        self.sequencer.is_pending()
    }
}
