use crate::{error::ClientError, message::InboundMessage, request::RequestId};
use fnv::FnvHashMap;
use std::{collections::BTreeSet, time::Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Number of timed-out ids remembered per socket. Older ids are forgotten first.
pub const MAX_EXPIRED_IDS: usize = 256;

/// Outcome delivered to a caller waiting on a correlated reply.
pub type Reply = Result<InboundMessage, ClientError>;

/// Caller waiting on the correlated reply to `request_id`.
#[derive(Debug)]
pub struct PendingRequest {
    pub operation: &'static str,
    pub issued_at: Instant,
    /// Socket session the request was sent on.
    pub session: u64,
    tx: oneshot::Sender<Reply>,
}

/// Registry of in-flight correlated requests. Every entry is removed at most once: by its
/// reply, by its timeout, or by [`PendingRegistry::fail_all`].
#[derive(Debug, Default)]
pub struct PendingRegistry {
    requests: FnvHashMap<RequestId, PendingRequest>,
    /// Most recent ids that timed out on the current socket, so late replies can be ignored.
    expired: BTreeSet<RequestId>,
}

impl PendingRegistry {
    /// Register a correlated request and return the receiver its reply will arrive on.
    pub fn register(
        &mut self,
        request_id: RequestId,
        operation: &'static str,
        session: u64,
    ) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        let previous = self.requests.insert(
            request_id,
            PendingRequest {
                operation,
                issued_at: Instant::now(),
                session,
                tx,
            },
        );
        if let Some(previous) = previous {
            warn!(
                %request_id,
                operation = previous.operation,
                "replaced pending request with duplicate request id"
            );
        }
        rx
    }

    /// Deliver `reply` to the caller waiting on `request_id`.
    ///
    /// Returns the reply back if no request is pending for the id, so the frame can be
    /// dispatched as an unsolicited push instead.
    pub fn resolve(&mut self, request_id: RequestId, reply: Reply) -> Option<Reply> {
        match self.requests.remove(&request_id) {
            Some(pending) => {
                debug!(
                    %request_id,
                    operation = pending.operation,
                    elapsed = ?pending.issued_at.elapsed(),
                    "resolved pending request"
                );
                // Caller may have given up already, the entry is gone either way
                let _ = pending.tx.send(reply);
                None
            }
            None => Some(reply),
        }
    }

    /// Remove the entry for `request_id` if it still belongs to `session`. Used on timeout.
    pub fn expire(&mut self, request_id: RequestId, session: u64) -> bool {
        match self.requests.get(&request_id) {
            Some(pending) if pending.session == session => {
                self.requests.remove(&request_id);
                self.expired.insert(request_id);
                while self.expired.len() > MAX_EXPIRED_IDS {
                    self.expired.pop_first();
                }
                true
            }
            _ => false,
        }
    }

    /// Fail every pending request with `error` and empty the registry.
    pub fn fail_all(&mut self, error: ClientError) -> usize {
        let count = self.requests.len();
        for (_, pending) in self.requests.drain() {
            let _ = pending.tx.send(Err(error.clone()));
        }
        count
    }

    /// Determine if `request_id` timed out on the current socket.
    pub fn was_expired(&self, request_id: RequestId) -> bool {
        self.expired.contains(&request_id)
    }

    /// Forget expired ids. Called whenever correlation ids restart.
    pub fn clear_expired(&mut self) {
        self.expired.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
