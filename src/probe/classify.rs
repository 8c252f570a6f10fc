//! Failure classification of radclient output.

use super::QueryError;

/// Printed by radclient when the server never answered.
pub const NO_RESPONSE_MARKER: &str = "radclient: no response from server";

/// Printed by radclient when the server answered with Access-Reject.
pub const ACCESS_REJECT_MARKER: &str = "rad_recv: Access-Reject";

/// Classify the outcome of a status exchange.
///
/// Text markers are checked before the exit code: radclient exits 0 on some
/// failure paths, so a reject marker wins even on a clean exit.
pub fn classify(output: &str, exit_code: i32) -> Result<(), QueryError> {
    if output.contains(NO_RESPONSE_MARKER) {
        return Err(QueryError::Timeout);
    }
    if output.contains(ACCESS_REJECT_MARKER) {
        return Err(QueryError::AccessRejected);
    }
    if exit_code != 0 {
        return Err(QueryError::AbnormalExit {
            code: exit_code,
            output: output.to_string(),
        });
    }
    Ok(())
}
