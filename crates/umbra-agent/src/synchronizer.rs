//! The report sequence: the one path that transmits `reported` state.
//!
//! Every caller — delta reconciler, convergence driver, the supervisor's
//! initial report — funnels through `report_state`, which serializes
//! access to the shared state and the outbound connection.

use umbra_protocol::document::{ReportDocument, client_token};

use crate::error::ReportError;
use crate::session::Session;

/// Compose and transmit one shadow report.
///
/// Acquires the report lock with a bounded wait, reads `reported` fresh,
/// and holds the lock across the transport call so at most one report is
/// ever in flight. The lock is released on every path before returning.
/// A connection-level transport failure marks the session lost as a side
/// effect, triggering the supervisor's teardown/reconnect path.
pub async fn report_state(session: &Session) -> Result<(), ReportError> {
    let guard = session.store.lock().await.ok_or_else(|| {
        tracing::warn!(device = %session.identity, "report lock contended, skipping report");
        ReportError::LockTimeout
    })?;

    let document = ReportDocument::new(guard.reported, client_token());
    let payload = document
        .to_bytes()
        .map_err(|e| ReportError::Encode(e.to_string()))?;

    let result = session
        .connection
        .update_shadow(
            session.identity.hex(),
            &payload,
            true,
            session.report_timeout,
        )
        .await;

    drop(guard);

    match result {
        Ok(()) => {
            tracing::debug!(
                device = %session.identity,
                token = %document.client_token,
                "shadow report sent"
            );
            Ok(())
        }
        Err(e) => {
            if e.is_connection_level() {
                tracing::error!(error = %e, "shadow update failed, presuming connection dead");
                session.mark_lost();
            } else {
                tracing::warn!(error = %e, "shadow update failed");
            }
            Err(ReportError::Transport(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use umbra_protocol::DeviceIdentity;
    use umbra_transport::{
        ConnectOptions, MockConnection, MockTransport, Transport, TransportError,
    };

    async fn session_with_mock() -> (Session, Arc<MockConnection>) {
        let transport = MockTransport::new();
        let link = transport
            .connect(&ConnectOptions {
                client_id: "umbra-test".into(),
                keep_alive: Duration::from_secs(60),
                clean_session: true,
                will: None,
            })
            .await
            .unwrap();
        let mock = transport.last_connection().unwrap();
        let session = Session::new(
            DeviceIdentity::from_bytes([0xa4, 0xcf, 0x12, 0x05, 0x7f, 0x30]),
            link.connection,
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        (session, mock)
    }

    #[tokio::test]
    async fn report_carries_current_state_and_token() {
        let (session, mock) = session_with_mock().await;
        {
            let mut guard = session.store.lock().await.unwrap();
            guard.reported.power_on = true;
            guard.reported.temperature = 27;
        }

        report_state(&session).await.unwrap();

        let updates = mock.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].thing_name, "a4cf12057f30");
        assert!(updates[0].keep_subscriptions);

        let value: serde_json::Value = serde_json::from_slice(&updates[0].payload).unwrap();
        assert_eq!(value["state"]["reported"]["powerOn"], 1);
        assert_eq!(value["state"]["reported"]["temperature"], 27);
        assert_eq!(value["clientToken"].as_str().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn lock_timeout_skips_transport_call() {
        let (session, mock) = session_with_mock().await;
        let _held = session.store.lock().await.unwrap();

        let err = report_state(&session).await.unwrap_err();
        assert!(matches!(err, ReportError::LockTimeout));
        assert_eq!(mock.update_count(), 0);
    }

    #[tokio::test]
    async fn connection_level_failure_marks_session_lost() {
        let (session, mock) = session_with_mock().await;
        mock.fail_next_update(TransportError::Connection("broker reset".into()));

        let err = report_state(&session).await.unwrap_err();
        assert!(matches!(err, ReportError::Transport(_)));
        assert!(session.is_lost());
    }

    #[tokio::test]
    async fn timeout_failure_does_not_mark_lost() {
        let (session, mock) = session_with_mock().await;
        mock.fail_next_update(TransportError::Timeout(Duration::from_secs(5)));

        assert!(report_state(&session).await.is_err());
        assert!(!session.is_lost());
    }

    #[tokio::test]
    async fn lock_released_after_failed_report() {
        let (session, mock) = session_with_mock().await;
        mock.fail_next_update(TransportError::Connection("gone".into()));

        let _ = report_state(&session).await;

        // The lock must be free again.
        assert!(session.store.lock().await.is_some());
    }
}
