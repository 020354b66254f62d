use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::warn;

use crate::operation::OperationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} operation already in flight")]
pub struct AlreadyInFlight(pub OperationKind);

/// Allows at most one in-flight operation per [`OperationKind`]. Kinds are
/// independent: a query may run while an ingestion is running.
///
/// The guard never cancels the request it protects.
#[derive(Debug, Clone, Default)]
pub struct RequestGuard {
    in_flight: Arc<Mutex<HashSet<OperationKind>>>,
}

impl RequestGuard {
    pub fn begin(&self, kind: OperationKind) -> Result<InFlight, AlreadyInFlight> {
        let mut in_flight = self
            .in_flight
            .lock()
            .expect("request guard mutex should not be poisoned");

        if !in_flight.insert(kind) {
            warn!(operation = %kind, "rejected duplicate submission while in flight");
            return Err(AlreadyInFlight(kind));
        }

        Ok(InFlight {
            kind,
            guard: self.clone(),
            released: false,
        })
    }

    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        self.in_flight
            .lock()
            .expect("request guard mutex should not be poisoned")
            .contains(&kind)
    }

    fn release(&self, kind: OperationKind) {
        self.in_flight
            .lock()
            .expect("request guard mutex should not be poisoned")
            .remove(&kind);
    }
}

/// Release token returned by [`RequestGuard::begin`]. Consumed by
/// [`InFlight::end`]; dropping it releases as well, so an abandoned future
/// cannot leave the kind held.
#[must_use = "dropping the token releases the guard immediately"]
#[derive(Debug)]
pub struct InFlight {
    kind: OperationKind,
    guard: RequestGuard,
    released: bool,
}

impl InFlight {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn end(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.guard.release(self.kind);
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::{AlreadyInFlight, RequestGuard};
    use crate::operation::OperationKind;

    #[test]
    fn second_begin_of_same_kind_is_rejected() {
        let guard = RequestGuard::default();

        let token = guard.begin(OperationKind::Query).expect("first begin should succeed");
        assert_eq!(
            guard.begin(OperationKind::Query).expect_err("second begin should fail"),
            AlreadyInFlight(OperationKind::Query)
        );

        token.end();
        assert!(!guard.is_in_flight(OperationKind::Query));
        guard
            .begin(OperationKind::Query)
            .expect("begin after end should succeed")
            .end();
    }

    #[test]
    fn kinds_are_independent() {
        let guard = RequestGuard::default();

        let ingest = guard.begin(OperationKind::Ingest).expect("ingest should begin");
        let query = guard.begin(OperationKind::Query).expect("query should begin alongside ingest");

        assert!(guard.is_in_flight(OperationKind::Ingest));
        assert!(guard.is_in_flight(OperationKind::Query));

        ingest.end();
        assert!(!guard.is_in_flight(OperationKind::Ingest));
        assert!(guard.is_in_flight(OperationKind::Query));
        query.end();
    }

    #[test]
    fn dropping_token_releases_kind() {
        let guard = RequestGuard::default();

        {
            let _token = guard.begin(OperationKind::Ingest).expect("ingest should begin");
            assert!(guard.is_in_flight(OperationKind::Ingest));
        }

        assert!(!guard.is_in_flight(OperationKind::Ingest));
    }

    #[test]
    fn clones_share_in_flight_state() {
        let guard = RequestGuard::default();
        let other = guard.clone();

        let token = guard.begin(OperationKind::Ingest).expect("ingest should begin");
        assert!(other.begin(OperationKind::Ingest).is_err());
        token.end();
        assert!(other.begin(OperationKind::Ingest).is_ok());
    }
}
