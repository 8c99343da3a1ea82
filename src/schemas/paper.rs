use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::PaperRow;
use crate::errors::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Paper {
    pub id: String,
    pub name: String,
    pub subject_id: String,
    pub grade_level: Option<String>,
    pub year: String,
    pub duration_minutes: u32,
    #[validate(range(min = 0.0, message = "total_score must be non-negative"))]
    pub total_score: f64,
    pub is_writable: bool,
}

impl Paper {
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }
}

impl TryFrom<PaperRow> for Paper {
    type Error = StoreError;

    fn try_from(row: PaperRow) -> Result<Self, Self::Error> {
        let duration_minutes = parse_duration_minutes(&row.duration).ok_or_else(|| {
            StoreError::InvalidRecord {
                entity: "paper",
                id: row.id.clone(),
                reason: format!("unparseable duration {:?}", row.duration),
            }
        })?;

        let paper = Self {
            id: row.id,
            name: row.name,
            subject_id: row.subject_id,
            grade_level: row.grade_level,
            year: row.year,
            duration_minutes,
            total_score: row.total_score,
            is_writable: row.is_writable,
        };
        paper.validate().map_err(|err| StoreError::InvalidRecord {
            entity: "paper",
            id: paper.id.clone(),
            reason: err.to_string(),
        })?;
        Ok(paper)
    }
}

/// Durations are stored as free text; the leading integer is the number of minutes.
fn parse_duration_minutes(raw: &str) -> Option<u32> {
    let digits: String =
        raw.trim_start().chars().take_while(|ch| ch.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(duration: &str) -> PaperRow {
        PaperRow {
            id: "p1".to_string(),
            name: "Mathematics Paper 1".to_string(),
            subject_id: "math".to_string(),
            grade_level: Some("Twelve".to_string()),
            year: "2019".to_string(),
            duration: duration.to_string(),
            total_score: 100.0,
            is_writable: true,
        }
    }

    #[test]
    fn duration_takes_leading_integer() {
        assert_eq!(parse_duration_minutes("150"), Some(150));
        assert_eq!(parse_duration_minutes(" 90 minutes"), Some(90));
        assert_eq!(parse_duration_minutes("two hours"), None);
        assert_eq!(parse_duration_minutes(""), None);
    }

    #[test]
    fn paper_row_converts() {
        let paper = Paper::try_from(row("120")).expect("paper");
        assert_eq!(paper.duration_seconds(), 7200);
    }

    #[test]
    fn paper_row_rejects_bad_duration() {
        assert!(matches!(
            Paper::try_from(row("n/a")),
            Err(StoreError::InvalidRecord { entity: "paper", .. })
        ));
    }
}
