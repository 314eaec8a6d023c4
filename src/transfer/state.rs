//! Transfer status definitions
//!
//! Status IDs are stored as SMALLINT in PostgreSQL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transfer lifecycle status
///
/// ```text
/// PENDING → IN_PROGRESS → COMPLETED
///    ↓           ↓
///  FAILED      FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(i16)]
pub enum TransferStatus {
    /// Recorded, nothing moved yet
    Pending = 0,

    /// Work underway (partner delivery or settlement)
    InProgress = 10,

    /// Terminal: funds moved
    Completed = 40,

    /// Terminal: no funds moved, see error message
    Failed = -10,
}

impl TransferStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    /// Whether `self → next` is an edge of the lifecycle
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::InProgress)
                | (TransferStatus::Pending, TransferStatus::Failed)
                | (TransferStatus::InProgress, TransferStatus::Completed)
                | (TransferStatus::InProgress, TransferStatus::Failed)
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferStatus::Pending),
            10 => Some(TransferStatus::InProgress),
            40 => Some(TransferStatus::Completed),
            -10 => Some(TransferStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::InProgress => "inProgress",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TransferStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransferStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TransferStatus; 4] = [
        TransferStatus::Pending,
        TransferStatus::InProgress,
        TransferStatus::Completed,
        TransferStatus::Failed,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [TransferStatus::Completed, TransferStatus::Failed] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_transition_table() {
        use TransferStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Failed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(InProgress));
    }

    #[test]
    fn test_status_id_roundtrip() {
        for status in ALL {
            assert_eq!(TransferStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(TransferStatus::from_id(99), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransferStatus::InProgress).unwrap(),
            "\"inProgress\""
        );
        assert_eq!(TransferStatus::Completed.to_string(), "completed");
    }
}
