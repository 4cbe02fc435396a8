//! Labels for list and detail screens.
//!
//! Pure string helpers over loaded records; nothing here touches storage.

use crate::model::follow_up::Observation;
use crate::model::guardian::{Guardian, GuardianKind};
use crate::model::history::History;
use crate::model::student::{Student, Tutor};
use crate::service::report_service::ReportDetail;
use serde::Serialize;

pub const READ_LABEL: &str = "✅ Read";
pub const UNREAD_LABEL: &str = "📩 Unread";
pub const NO_STUDENTS_LABEL: &str = "No students";
pub const NOT_ASSIGNED_LABEL: &str = "Not assigned";
pub const NO_STUDENT_LABEL: &str = "No student";

pub fn read_status_label(is_read: bool) -> &'static str {
    if is_read {
        READ_LABEL
    } else {
        UNREAD_LABEL
    }
}

/// Comma-joined student names of a guardian.
pub fn linked_students_label(students: &[Student]) -> String {
    if students.is_empty() {
        return NO_STUDENTS_LABEL.to_string();
    }
    students
        .iter()
        .map(|student| student.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn student_label(student: &Student) -> String {
    student.name.clone()
}

/// `"name - national id"`, or the bare name when no ID is recorded.
pub fn student_with_national_id(student: &Student) -> String {
    match student.national_id.as_deref() {
        Some(national_id) => format!("{} - {national_id}", student.name),
        None => student.name.clone(),
    }
}

pub fn guardian_label(kind: GuardianKind, guardian: Option<&Guardian>) -> String {
    match guardian {
        Some(guardian) => guardian.name.clone(),
        None => format!("No {} registered", guardian_noun(kind)),
    }
}

pub fn tutor_label(tutor: Option<&Tutor>) -> String {
    match tutor {
        Some(tutor) => format!("{} {}", tutor.name, tutor.surname),
        None => NOT_ASSIGNED_LABEL.to_string(),
    }
}

/// Student name for an observation row; `student` is the back-reference.
pub fn observation_student_label(observation: &Observation, student: Option<&Student>) -> String {
    match (observation.student_uuid, student) {
        (Some(_), Some(student)) => student.name.clone(),
        _ => NO_STUDENT_LABEL.to_string(),
    }
}

fn guardian_noun(kind: GuardianKind) -> &'static str {
    match kind {
        GuardianKind::Father => "father",
        GuardianKind::Mother => "mother",
        GuardianKind::LegalGuardian => "legal guardian",
    }
}

/// One row of the report list screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub student: String,
    pub condition: String,
    pub father: String,
    pub mother: String,
    pub legal_guardian: String,
    pub tutor: String,
    pub response_action: String,
    pub reported_at: i64,
}

impl ReportRow {
    pub fn from_detail(detail: &ReportDetail) -> Self {
        Self {
            student: student_with_national_id(&detail.student),
            condition: detail.report.condition.label().to_string(),
            father: guardian_label(GuardianKind::Father, detail.father.as_ref()),
            mother: guardian_label(GuardianKind::Mother, detail.mother.as_ref()),
            legal_guardian: guardian_label(
                GuardianKind::LegalGuardian,
                detail.legal_guardian.as_ref(),
            ),
            tutor: tutor_label(detail.tutor.as_ref()),
            response_action: detail
                .response_action
                .as_ref()
                .map(|action| action.name.clone())
                .unwrap_or_else(|| NOT_ASSIGNED_LABEL.to_string()),
            reported_at: detail.report.reported_at,
        }
    }
}

/// One row of the history list screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub student: String,
    pub report_count: u32,
    pub updated_at: i64,
}

impl HistoryRow {
    pub fn new(student: &Student, history: &History) -> Self {
        Self {
            student: student_with_national_id(student),
            report_count: history.report_count,
            updated_at: history.updated_at,
        }
    }
}
