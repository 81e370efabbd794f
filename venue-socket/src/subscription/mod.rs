use crate::request::RequestId;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Contract lifecycle models and [`ActiveContract`](contract::ActiveContract) bookkeeping.
pub mod contract;

/// Tick stream model.
pub mod tick;

/// Handle identifying a live venue stream.
///
/// The correlation id of the subscribe request is known immediately, the venue stream id is
/// adopted once the first reply or push carrying `subscription.id` arrives. Correlation ids
/// restart with every socket, so a handle only matches replies from the `session` it was
/// opened on.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct SubscriptionHandle {
    pub request_id: RequestId,
    pub session: u64,
    pub venue_id: Option<SmolStr>,
}

impl SubscriptionHandle {
    pub fn new(request_id: RequestId, session: u64) -> Self {
        Self {
            request_id,
            session,
            venue_id: None,
        }
    }

    /// Determine if the stream was opened on socket `session`.
    pub fn is_live_on(&self, session: u64) -> bool {
        self.session == session
    }

    /// Key sent in a `forget` request for this stream.
    pub fn forget_key(&self) -> String {
        match &self.venue_id {
            Some(venue_id) => venue_id.to_string(),
            None => self.request_id.to_string(),
        }
    }
}

/// Tick subscriptions keyed by symbol, at most one per symbol.
#[derive(Clone, Debug, Default)]
pub struct TickSubscriptions {
    by_symbol: FnvHashMap<SmolStr, SubscriptionHandle>,
}

impl TickSubscriptions {
    /// Record the handle for `symbol`, replacing any previous handle.
    pub fn insert(&mut self, symbol: SmolStr, handle: SubscriptionHandle) -> Option<SubscriptionHandle> {
        self.by_symbol.insert(symbol, handle)
    }

    /// Remove and return the handle for `symbol`. Unknown symbols yield `None`.
    pub fn remove(&mut self, symbol: &str) -> Option<SubscriptionHandle> {
        self.by_symbol.remove(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&SubscriptionHandle> {
        self.by_symbol.get(symbol)
    }

    /// Adopt the venue stream id for `symbol` if it is not yet known.
    pub fn adopt_venue_id(&mut self, symbol: &str, session: u64, venue_id: &SmolStr) {
        if let Some(handle) = self.by_symbol.get_mut(symbol)
            && handle.is_live_on(session)
            && handle.venue_id.is_none()
        {
            handle.venue_id = Some(venue_id.clone());
        }
    }

    /// Adopt the venue stream id for the subscription opened by `request_id` on `session`.
    pub fn adopt_venue_id_by_request(
        &mut self,
        request_id: RequestId,
        session: u64,
        venue_id: &SmolStr,
    ) {
        if let Some(handle) = self
            .by_symbol
            .values_mut()
            .find(|handle| handle.request_id == request_id && handle.is_live_on(session))
            && handle.venue_id.is_none()
        {
            handle.venue_id = Some(venue_id.clone());
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &SmolStr> {
        self.by_symbol.keys()
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_symbol.clear();
    }
}
