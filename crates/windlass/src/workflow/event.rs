//! History events for persistence

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened, with the fields that matter for that kind of event
///
/// Events are immutable once recorded. The history is an append-only log
/// used for auditing, debugging, and terminal-result retrieval; a future
/// replay path would reconstruct workflow progress from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Workflow was started with the given input
    WorkflowStarted {
        /// The input provided when starting the workflow
        input: Option<serde_json::Value>,
    },

    /// Workflow completed successfully
    WorkflowCompleted {
        /// The result value
        result: Option<serde_json::Value>,
    },

    /// Workflow failed with an error
    WorkflowFailed {
        /// Error message
        error: String,
    },

    /// Workflow was canceled via an explicit cancel call
    WorkflowCanceled,

    /// Activity execution started
    ActivityStarted {
        /// Name of the activity
        activity_name: String,

        /// Input for the activity
        input: Option<serde_json::Value>,
    },

    /// Activity completed successfully
    ActivityCompleted {
        /// Name of the activity
        activity_name: String,

        /// Result returned by the activity
        result: Option<serde_json::Value>,
    },

    /// Activity failed (after retries, if any were configured)
    ActivityFailed {
        /// Name of the activity
        activity_name: String,

        /// Error message
        error: String,
    },

    /// External signal was delivered
    SignalReceived {
        /// Name of the signal
        signal_name: String,

        /// Payload carried by the signal
        signal_payload: serde_json::Value,
    },

    /// A durable sleep elapsed
    TimerFired {
        /// How long the timer ran
        #[serde(with = "duration_millis")]
        duration: Duration,
    },
}

impl EventKind {
    /// Get the activity name if this is an activity-related event
    pub fn activity_name(&self) -> Option<&str> {
        match self {
            Self::ActivityStarted { activity_name, .. }
            | Self::ActivityCompleted { activity_name, .. }
            | Self::ActivityFailed { activity_name, .. } => Some(activity_name),
            _ => None,
        }
    }

    /// Check if this is a terminal workflow event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::WorkflowCompleted { .. } | Self::WorkflowFailed { .. } | Self::WorkflowCanceled
        )
    }
}

/// A single record in a workflow's audit trail
///
/// Event IDs are dense and strictly increasing within one workflow,
/// starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEvent {
    /// Monotonic sequential identifier (first event = 1)
    pub id: u64,

    /// Wall clock time at event creation
    pub timestamp: DateTime<Utc>,

    /// What happened
    #[serde(flatten)]
    pub kind: EventKind,
}

impl HistoryEvent {
    /// Create an event with the given sequence number, stamped now
    pub fn new(id: u64, kind: EventKind) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() {
        let event = HistoryEvent::new(
            1,
            EventKind::WorkflowStarted {
                input: Some(json!({"order_id": "123"})),
            },
        );

        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains("\"type\":\"workflow_started\""));
        assert!(encoded.contains("\"id\":1"));

        let parsed: HistoryEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_timer_event_round_trip() {
        let event = HistoryEvent::new(
            3,
            EventKind::TimerFired {
                duration: Duration::from_millis(1500),
            },
        );

        let encoded = serde_json::to_string(&event).unwrap();
        let parsed: HistoryEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_activity_name_extraction() {
        let event = EventKind::ActivityStarted {
            activity_name: "charge_card".to_string(),
            input: None,
        };
        assert_eq!(event.activity_name(), Some("charge_card"));

        let started = EventKind::WorkflowStarted { input: None };
        assert_eq!(started.activity_name(), None);
    }

    #[test]
    fn test_is_terminal() {
        assert!(EventKind::WorkflowCompleted { result: None }.is_terminal());
        assert!(EventKind::WorkflowFailed {
            error: "boom".to_string()
        }
        .is_terminal());
        assert!(EventKind::WorkflowCanceled.is_terminal());

        assert!(!EventKind::WorkflowStarted { input: None }.is_terminal());
        assert!(!EventKind::SignalReceived {
            signal_name: "approval".to_string(),
            signal_payload: json!(true),
        }
        .is_terminal());
    }
}
