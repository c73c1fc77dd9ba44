use serde::{Deserialize, Serialize};

pub const PATIENT_INFORMATION: &str = "Patient Information";
pub const COMPLETE_BLOOD_COUNT: &str = "Complete Blood Count (CBC)";
pub const HEMOGLOBIN_RBC: &str = "Hemoglobin & RBC Parameters";

/// Lab values keyed by category, in the order they are serialized.
/// Every field starts as `None` and serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    #[serde(rename = "Patient Information")]
    pub patient_information: PatientInformation,
    #[serde(rename = "Complete Blood Count (CBC)")]
    pub complete_blood_count: CompleteBloodCount,
    #[serde(rename = "Hemoglobin & RBC Parameters")]
    pub hemoglobin_rbc: HemoglobinRbcParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInformation {
    pub patient_name: Option<String>,
    pub age: Option<String>,
    pub uhid: Option<String>,
    pub reference_number: Option<String>,
    pub sample_date_time: Option<String>,
    pub report_date_time: Option<String>,
    pub patient_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteBloodCount {
    pub total_wbc: Option<String>,
    pub neutrophils: Option<String>,
    pub lymphocytes: Option<String>,
    pub monocytes: Option<String>,
    pub eosinophils: Option<String>,
    pub basophils: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HemoglobinRbcParameters {
    pub hemoglobin: Option<String>,
    pub rbc_count: Option<String>,
    pub mcv: Option<String>,
    pub hematocrit: Option<String>,
    pub mch: Option<String>,
    pub mchc: Option<String>,
    pub rdw: Option<String>,
    pub platelet_count: Option<String>,
}

impl PatientInformation {
    pub const FIELDS: [&'static str; 7] = [
        "patient_name",
        "age",
        "uhid",
        "reference_number",
        "sample_date_time",
        "report_date_time",
        "patient_id",
    ];

    fn slot_mut(&mut self, label: &str) -> Option<&mut Option<String>> {
        match label {
            "patient_name" => Some(&mut self.patient_name),
            "age" => Some(&mut self.age),
            "uhid" => Some(&mut self.uhid),
            "reference_number" => Some(&mut self.reference_number),
            "sample_date_time" => Some(&mut self.sample_date_time),
            "report_date_time" => Some(&mut self.report_date_time),
            "patient_id" => Some(&mut self.patient_id),
            _ => None,
        }
    }

    fn values(&self) -> [&Option<String>; 7] {
        [
            &self.patient_name,
            &self.age,
            &self.uhid,
            &self.reference_number,
            &self.sample_date_time,
            &self.report_date_time,
            &self.patient_id,
        ]
    }
}

impl CompleteBloodCount {
    pub const FIELDS: [&'static str; 6] = [
        "total_wbc",
        "neutrophils",
        "lymphocytes",
        "monocytes",
        "eosinophils",
        "basophils",
    ];

    fn slot_mut(&mut self, label: &str) -> Option<&mut Option<String>> {
        match label {
            "total_wbc" => Some(&mut self.total_wbc),
            "neutrophils" => Some(&mut self.neutrophils),
            "lymphocytes" => Some(&mut self.lymphocytes),
            "monocytes" => Some(&mut self.monocytes),
            "eosinophils" => Some(&mut self.eosinophils),
            "basophils" => Some(&mut self.basophils),
            _ => None,
        }
    }

    fn values(&self) -> [&Option<String>; 6] {
        [
            &self.total_wbc,
            &self.neutrophils,
            &self.lymphocytes,
            &self.monocytes,
            &self.eosinophils,
            &self.basophils,
        ]
    }
}

impl HemoglobinRbcParameters {
    pub const FIELDS: [&'static str; 8] = [
        "hemoglobin",
        "rbc_count",
        "mcv",
        "hematocrit",
        "mch",
        "mchc",
        "rdw",
        "platelet_count",
    ];

    fn slot_mut(&mut self, label: &str) -> Option<&mut Option<String>> {
        match label {
            "hemoglobin" => Some(&mut self.hemoglobin),
            "rbc_count" => Some(&mut self.rbc_count),
            "mcv" => Some(&mut self.mcv),
            "hematocrit" => Some(&mut self.hematocrit),
            "mch" => Some(&mut self.mch),
            "mchc" => Some(&mut self.mchc),
            "rdw" => Some(&mut self.rdw),
            "platelet_count" => Some(&mut self.platelet_count),
            _ => None,
        }
    }

    fn values(&self) -> [&Option<String>; 8] {
        [
            &self.hemoglobin,
            &self.rbc_count,
            &self.mcv,
            &self.hematocrit,
            &self.mch,
            &self.mchc,
            &self.rdw,
            &self.platelet_count,
        ]
    }
}

impl StructuredReport {
    /// Every known field label, category by category.
    pub fn labels() -> impl Iterator<Item = &'static str> {
        PatientInformation::FIELDS
            .into_iter()
            .chain(CompleteBloodCount::FIELDS)
            .chain(HemoglobinRbcParameters::FIELDS)
    }

    /// The field a label writes to. Categories are searched in order, so the
    /// first category declaring a label owns it.
    pub fn slot_mut(&mut self, label: &str) -> Option<&mut Option<String>> {
        if let Some(slot) = self.patient_information.slot_mut(label) {
            return Some(slot);
        }
        if let Some(slot) = self.complete_blood_count.slot_mut(label) {
            return Some(slot);
        }
        self.hemoglobin_rbc.slot_mut(label)
    }

    pub fn populated_fields(&self) -> usize {
        self.patient_information
            .values()
            .into_iter()
            .chain(self.complete_blood_count.values())
            .chain(self.hemoglobin_rbc.values())
            .filter(|v| v.is_some())
            .count()
    }
}
