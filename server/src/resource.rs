/// Where a remotely fetched resource stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotFetched,
    Loading,
    /// Loaded at least once; the value may be empty.
    Loaded,
}

/// Client-side copy of a remote resource.
///
/// Every fetch takes a ticket from a per-resource counter. A response is only
/// applied when its ticket is newer than the last applied one, so a slow
/// response can never overwrite a fresher one.
#[derive(Debug, Clone)]
pub struct Resource<T> {
    data: Option<T>,
    issued: u64,
    applied: u64,
    in_flight: usize,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            data: None,
            issued: 0,
            applied: 0,
            in_flight: 0,
        }
    }
}

impl<T> Resource<T> {
    pub fn phase(&self) -> Phase {
        if self.data.is_some() {
            Phase::Loaded
        } else if self.in_flight > 0 {
            Phase::Loading
        } else {
            Phase::NotFetched
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Starts a fetch and returns its ticket.
    pub fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    /// Applies a successful response. Returns false when the response is stale.
    pub fn complete(&mut self, ticket: u64, value: T) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket <= self.applied {
            return false;
        }
        self.applied = ticket;
        self.data = Some(value);
        true
    }

    /// Records a failed fetch; the previous value, if any, is kept.
    pub fn fail(&mut self, _ticket: u64) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}
