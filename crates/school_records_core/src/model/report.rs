//! Incident report record.
//!
//! # Invariants
//! - A report always belongs to exactly one student.
//! - Every other reference is optional and independently nullable.
//! - `condition` is drawn from the fixed [`Condition`] set.

use super::follow_up::{ObservationId, ResponseActionId};
use super::guardian::{GuardianId, GuardianKind};
use super::student::{StudentId, TutorId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type ReportId = Uuid;

/// Reason a report was filed.
///
/// Serialized with the stored code, which is also the text shown in
/// notification messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "embarazo")]
    Pregnancy,
    #[serde(rename = "madre_lactante")]
    NursingMother,
    #[serde(rename = "tratamiento_psiquiatrico")]
    PsychiatricTreatment,
    #[serde(rename = "certificado_medico")]
    MedicalCertificate,
    #[serde(rename = "sustancias_psicoactivas")]
    PsychoactiveSubstances,
    #[serde(rename = "evade_clases")]
    ClassEvasion,
    #[serde(rename = "alcohol")]
    AlcoholUse,
    #[serde(rename = "violencia")]
    Violence,
    #[serde(rename = "siseve")]
    ReportingSystemCase,
    #[serde(rename = "tocamientos_indebidos")]
    ImproperTouching,
}

impl Condition {
    pub const ALL: [Condition; 10] = [
        Self::Pregnancy,
        Self::NursingMother,
        Self::PsychiatricTreatment,
        Self::MedicalCertificate,
        Self::PsychoactiveSubstances,
        Self::ClassEvasion,
        Self::AlcoholUse,
        Self::Violence,
        Self::ReportingSystemCase,
        Self::ImproperTouching,
    ];

    /// Stored code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Pregnancy => "embarazo",
            Self::NursingMother => "madre_lactante",
            Self::PsychiatricTreatment => "tratamiento_psiquiatrico",
            Self::MedicalCertificate => "certificado_medico",
            Self::PsychoactiveSubstances => "sustancias_psicoactivas",
            Self::ClassEvasion => "evade_clases",
            Self::AlcoholUse => "alcohol",
            Self::Violence => "violencia",
            Self::ReportingSystemCase => "siseve",
            Self::ImproperTouching => "tocamientos_indebidos",
        }
    }

    /// Display label for list screens.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pregnancy => "Pregnancy",
            Self::NursingMother => "Nursing mother",
            Self::PsychiatricTreatment => "Psychiatric treatment",
            Self::MedicalCertificate => "Medical certificate",
            Self::PsychoactiveSubstances => "Psychoactive substances",
            Self::ClassEvasion => "Class evasion",
            Self::AlcoholUse => "Alcohol use",
            Self::Violence => "Violence",
            Self::ReportingSystemCase => "SISEVE",
            Self::ImproperTouching => "Improper touching",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|condition| condition.code() == code)
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_code(value.trim()).ok_or_else(|| format!("unknown condition code `{value}`"))
    }
}

/// Behavioral or incident report about one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub uuid: ReportId,
    pub student_uuid: StudentId,
    pub father_uuid: Option<GuardianId>,
    pub mother_uuid: Option<GuardianId>,
    pub legal_guardian_uuid: Option<GuardianId>,
    pub tutor_uuid: Option<TutorId>,
    pub response_action_uuid: Option<ResponseActionId>,
    pub observation_uuid: Option<ObservationId>,
    pub condition: Condition,
    /// Epoch ms. Defaults to creation time, editable afterwards.
    pub reported_at: i64,
}

impl Report {
    pub fn new(student_uuid: StudentId, condition: Condition) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            student_uuid,
            father_uuid: None,
            mother_uuid: None,
            legal_guardian_uuid: None,
            tutor_uuid: None,
            response_action_uuid: None,
            observation_uuid: None,
            condition,
            reported_at: super::now_epoch_ms(),
        }
    }

    /// Guardian slot for `kind`.
    pub fn guardian(&self, kind: GuardianKind) -> Option<GuardianId> {
        match kind {
            GuardianKind::Father => self.father_uuid,
            GuardianKind::Mother => self.mother_uuid,
            GuardianKind::LegalGuardian => self.legal_guardian_uuid,
        }
    }

    /// Non-null guardian references in father, mother, legal guardian order.
    pub fn guardians(&self) -> impl Iterator<Item = (GuardianKind, GuardianId)> + '_ {
        GuardianKind::ALL
            .into_iter()
            .filter_map(|kind| self.guardian(kind).map(|id| (kind, id)))
    }
}
