use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::{DefectReportId, DomainError, DomainResult, Entity, ToolId, UserId};

/// A worker's report of newly discovered defective units of one tool.
///
/// Append-only: created once, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectReport {
    pub id: DefectReportId,
    pub tool_id: ToolId,
    pub reported_by: UserId,
    pub defective_count: u32,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

impl Entity for DefectReport {
    type Id = DefectReportId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Validated defect report that has not been recorded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDefectReport {
    tool_id: ToolId,
    reported_by: UserId,
    defective_count: u32,
    description: String,
}

impl NewDefectReport {
    /// `defective_count` must be strictly positive and fit the stock counters.
    pub fn new(
        tool_id: ToolId,
        reported_by: UserId,
        defective_count: i64,
        description: Option<String>,
    ) -> DomainResult<Self> {
        if defective_count <= 0 {
            return Err(DomainError::validation("defective_count must be positive"));
        }
        let defective_count = u32::try_from(defective_count).map_err(|_| {
            DomainError::validation(format!("defective_count must be at most {}", u32::MAX))
        })?;

        Ok(Self {
            tool_id,
            reported_by,
            defective_count,
            description: description.unwrap_or_default(),
        })
    }

    pub fn tool_id(&self) -> ToolId {
        self.tool_id
    }

    pub fn reported_by(&self) -> UserId {
        self.reported_by
    }

    pub fn defective_count(&self) -> u32 {
        self.defective_count
    }

    pub fn into_report(self, id: DefectReportId, recorded_at: DateTime<Utc>) -> DefectReport {
        DefectReport {
            id,
            tool_id: self.tool_id,
            reported_by: self.reported_by,
            defective_count: self.defective_count,
            description: self.description,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_must_be_positive() {
        let err = NewDefectReport::new(ToolId::new(), UserId::new(), 0, None).unwrap_err();
        assert_eq!(err, DomainError::validation("defective_count must be positive"));
        assert!(NewDefectReport::new(ToolId::new(), UserId::new(), -4, None).is_err());
    }

    #[test]
    fn count_must_fit_counter() {
        let err =
            NewDefectReport::new(ToolId::new(), UserId::new(), i64::from(u32::MAX) + 1, None)
                .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn into_report_keeps_fields() {
        let tool_id = ToolId::new();
        let worker = UserId::new();
        let at = Utc::now();
        let report = NewDefectReport::new(tool_id, worker, 3, Some("chipped edge".into()))
            .unwrap()
            .into_report(DefectReportId::new(), at);
        assert_eq!(report.tool_id, tool_id);
        assert_eq!(report.reported_by, worker);
        assert_eq!(report.defective_count, 3);
        assert_eq!(report.description, "chipped edge");
        assert_eq!(report.recorded_at, at);
    }

    #[test]
    fn missing_description_is_empty() {
        let report = NewDefectReport::new(ToolId::new(), UserId::new(), 1, None)
            .unwrap()
            .into_report(DefectReportId::new(), Utc::now());
        assert_eq!(report.description, "");
    }
}
