use std::collections::HashMap;

use tbench_core::Request;

/// Map from request ID (fingerprint) to the in-flight `Request`. Owned
/// exclusively by `ClientCore` under its single exclusive lock.
#[derive(Debug, Default)]
pub struct RequestTable {
    in_flight: HashMap<u64, Request>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, req: Request) {
        self.in_flight.insert(req.id, req);
    }

    /// Removes and returns the request for `id`, or `None` if absent —
    /// absence indicates protocol desync and is
    /// handled as fatal by the caller.
    pub fn remove(&mut self, id: u64) -> Option<Request> {
        self.in_flight.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_remove_round_trips() {
        let mut table = RequestTable::new();
        let req = Request::new(7, 1000, vec![1, 2, 3]).unwrap();
        table.insert(req);
        assert_eq!(table.len(), 1);
        let got = table.remove(7).unwrap();
        assert_eq!(got.id, 7);
        assert!(table.is_empty());
    }

    #[test]
    fn remove_missing_id_returns_none() {
        let mut table = RequestTable::new();
        assert!(table.remove(42).is_none());
    }
}
