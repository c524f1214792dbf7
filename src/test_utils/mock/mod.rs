//! Pre-programmed mocks for the collaborator ports
use mockall::predicate::eq;
use mockall::Sequence;

use crate::MockGaugeSink;
use crate::MockTokenValidator;
use crate::AuthError;
use crate::ADMIN_ROUTE_SCOPE;
use crate::TOTAL_SUBSCRIPTIONS_METRIC;

/// Sink that expects exactly one +1 followed by exactly one -1
pub(crate) fn accounted_sink() -> MockGaugeSink {
    let mut sink = MockGaugeSink::new();
    let mut seq = Sequence::new();
    sink.expect_gauge_delta()
        .with(eq(TOTAL_SUBSCRIPTIONS_METRIC), eq(1i64))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_gauge_delta()
        .with(eq(TOTAL_SUBSCRIPTIONS_METRIC), eq(-1i64))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink
}

/// Sink that must never be touched
pub(crate) fn untouched_sink() -> MockGaugeSink {
    let mut sink = MockGaugeSink::new();
    sink.expect_gauge_delta().times(0);
    sink
}

/// Validator expecting one admin-scope check of `authorization`
pub(crate) fn validator_answering(
    authorization: &'static str,
    answer: Result<(), AuthError>,
) -> MockTokenValidator {
    let mut validator = MockTokenValidator::new();
    validator
        .expect_decode_token()
        .with(eq(authorization), eq(ADMIN_ROUTE_SCOPE))
        .times(1)
        .return_const(answer);
    validator
}
