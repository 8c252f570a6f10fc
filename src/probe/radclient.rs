//! Status transport that shells out to FreeRADIUS' `radclient`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{QueryError, RawQueryResult, StatusRequest, StatusTransport, Target};

/// Extra time granted to radclient past its own timeout before it is killed.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Exit code reported when radclient could not run or died from a signal.
const NO_EXIT_CODE: i32 = -1;

/// Runs `radclient ... status <secret>` with the request on stdin.
#[derive(Debug, Clone)]
pub struct RadclientTransport {
    program: String,
}

impl Default for RadclientTransport {
    fn default() -> Self {
        Self::new("radclient")
    }
}

impl RadclientTransport {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Build the radclient argument list for a target.
///
/// `-r 1` keeps radclient to a single attempt so the wait stays bounded by
/// the configured timeout.
fn command_args(target: &Target) -> Vec<String> {
    vec![
        "-t".to_string(),
        target.timeout.as_secs_f64().to_string(),
        "-r".to_string(),
        "1".to_string(),
        "-x".to_string(),
        target.address(),
        "status".to_string(),
        target.secret.clone(),
    ]
}

/// When radclient is killed: its own timeout plus a grace period.
fn kill_deadline(target: &Target) -> Duration {
    target.timeout.saturating_add(KILL_GRACE)
}

impl StatusTransport for RadclientTransport {
    async fn round_trip(
        &self,
        target: &Target,
        request: &StatusRequest,
    ) -> Result<RawQueryResult, QueryError> {
        let mut child = Command::new(&self.program)
            .args(command_args(target))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| QueryError::AbnormalExit {
                code: NO_EXIT_CODE,
                output: format!("failed to execute {}: {}", self.program, e),
            })?;

        let start = Instant::now();

        if let Some(mut stdin) = child.stdin.take() {
            // radclient may already have exited; its output tells the story
            if let Err(e) = stdin.write_all(request.attributes().as_bytes()).await {
                tracing::debug!("Failed to write request to {}: {}", self.program, e);
            }
        }

        let deadline = kill_deadline(target);
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| QueryError::AbnormalExit {
                code: NO_EXIT_CODE,
                output: format!("failed to wait for {}: {}", self.program, e),
            })?,
            Err(_) => {
                tracing::debug!(
                    "{} did not finish within {:?} for {}, killed",
                    self.program,
                    deadline,
                    target.address()
                );
                return Err(QueryError::Timeout);
            }
        };

        let elapsed = start.elapsed();

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(RawQueryResult {
            output: text,
            elapsed,
            exit_code: output.status.code().unwrap_or(NO_EXIT_CODE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::target;
    use crate::probe::StatisticsCategory;

    #[test]
    fn test_command_args() {
        let mut t = target();
        t.timeout = Duration::from_millis(2500);
        assert_eq!(
            command_args(&t),
            vec!["-t", "2.5", "-r", "1", "-x", "127.0.0.1:18121", "status", "adminsecret"]
        );
    }

    #[test]
    fn test_kill_deadline_saturates() {
        let mut t = target();
        assert_eq!(kill_deadline(&t), Duration::from_secs(2));

        t.timeout = Duration::MAX;
        assert_eq!(kill_deadline(&t), Duration::MAX);
    }

    #[tokio::test]
    async fn test_missing_binary_is_abnormal_exit() {
        let transport = RadclientTransport::new("/nonexistent/radclient");
        let request = StatusRequest::new(StatisticsCategory::Authentication);

        match transport.round_trip(&target(), &request).await {
            Err(QueryError::AbnormalExit { code, output }) => {
                assert_eq!(code, NO_EXIT_CODE);
                assert!(output.contains("/nonexistent/radclient"));
            }
            other => panic!("expected AbnormalExit, got {:?}", other),
        }
    }

    #[cfg(unix)]
    fn fake_radclient(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("radclient");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_round_trip_captures_output_and_request() {
        let dir = tempfile::tempdir().unwrap();
        // Echo stdin back so the request attributes show up in the output
        let program = fake_radclient(
            dir.path(),
            "cat\necho\necho \"\tFreeRADIUS-Total-Access-Requests = 3\"\necho oops >&2",
        );
        let transport = RadclientTransport::new(program);
        let request = StatusRequest::new(StatisticsCategory::ProxyAccounting);

        let raw = transport.round_trip(&target(), &request).await.unwrap();
        assert_eq!(raw.exit_code, 0);
        assert!(raw.output.contains("FreeRADIUS-Statistics-Type = 8"));
        assert!(raw.output.contains("FreeRADIUS-Total-Access-Requests = 3"));
        assert!(raw.output.trim_end().ends_with("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_round_trip_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_radclient(dir.path(), "echo 'bad secret'\nexit 4");
        let transport = RadclientTransport::new(program);
        let request = StatusRequest::new(StatisticsCategory::Authentication);

        let raw = transport.round_trip(&target(), &request).await.unwrap();
        assert_eq!(raw.exit_code, 4);
        assert_eq!(raw.output, "bad secret\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_radclient_is_killed_as_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_radclient(dir.path(), "exec sleep 10");
        let transport = RadclientTransport::new(program);
        let request = StatusRequest::new(StatisticsCategory::Accounting);

        let mut t = target();
        t.timeout = Duration::from_millis(100);

        let start = Instant::now();
        let result = transport.round_trip(&t, &request).await;
        assert_eq!(result, Err(QueryError::Timeout));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
