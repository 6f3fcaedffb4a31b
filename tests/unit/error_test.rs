//! Tests for error types

use alarm_lot::core::{KeepAliveError, SchedulerError};

#[test]
fn test_quota_exceeded_error() {
    let err = SchedulerError::QuotaExceeded {
        needed: 7,
        available: 2,
    };
    assert_eq!(
        format!("{err}"),
        "queue full: alarm needs 7 slot(s), 2 available"
    );
    assert!(err.is_retryable());
}

#[test]
fn test_channel_unavailable_error() {
    let err = SchedulerError::ChannelUnavailable("list: timed out after 10ms".to_string());
    assert_eq!(
        format!("{err}"),
        "delivery channel unavailable: list: timed out after 10ms"
    );
}

#[test]
fn test_rolled_back_error() {
    let err = SchedulerError::PartialRegistrationRolledBack {
        alarm_id: "w".to_string(),
        registered: 2,
        reason: "add w-4 refused".to_string(),
    };
    assert_eq!(
        format!("{err}"),
        "alarm w rolled back after 2 registration(s): add w-4 refused"
    );
}

#[test]
fn test_caller_errors_are_not_retryable() {
    assert!(!SchedulerError::InvalidAlarm("missing identifier".into()).is_retryable());
    assert!(!SchedulerError::InvalidConfig("bad".into()).is_retryable());
    assert!(SchedulerError::StoreUnavailable("offline".into()).is_retryable());
}

#[test]
fn test_keep_alive_error() {
    let err = KeepAliveError::Playback("no active session".to_string());
    assert_eq!(format!("{err}"), "playback error: no active session");
}

#[test]
fn test_app_result_wraps_scheduler_error() {
    fn run() -> alarm_lot::core::AppResult<()> {
        Err::<(), _>(SchedulerError::InvalidAlarm("x".into()))?;
        Ok(())
    }
    let err = run().unwrap_err();
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}
