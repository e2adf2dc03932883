//! In-memory record of the most recent pipeline run.

use crate::report::ReportStatus;

/// What started a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Startup,
    Scheduled { slot: String },
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::Scheduled { slot } => write!(f, "scheduled@{slot}"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// A finished run, kept only until the next one replaces it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunRecord {
    pub run_id: uuid::Uuid,
    pub trigger: Trigger,
    pub status: ReportStatus,
    pub summary: String,
    pub summary_sent: bool,
    pub document_sent: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_display_and_json() {
        let t = Trigger::Scheduled {
            slot: "07:30".into(),
        };
        assert_eq!(t.to_string(), "scheduled@07:30");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["kind"], "scheduled");
        assert_eq!(json["slot"], "07:30");
        assert_eq!(serde_json::to_value(Trigger::Manual).unwrap()["kind"], "manual");
    }
}
