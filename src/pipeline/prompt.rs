use std::fmt::Write;

use super::schema::StructuredReport;

/// Rendered in place of a value the report never received.
pub const ABSENT_MARKER: &str = "None";

fn value(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(ABSENT_MARKER)
}

/// Builds the summary prompt for a populated report. Output depends only on
/// the report and `language`; field order and layout are fixed.
pub fn build_summary_prompt(report: &StructuredReport, language: &str) -> String {
    let patient = &report.patient_information;
    let cbc = &report.complete_blood_count;
    let rbc = &report.hemoglobin_rbc;

    let mut prompt = String::new();
    prompt.push_str(
        "As a medical professional, give a simple explanation of these lab results \
         and the patient's health status. Do not use medical jargon or conversational \
         filler.\n",
    );
    let _ = writeln!(
        prompt,
        "After the explanation, give the same explanation translated into {language}."
    );
    prompt.push_str(
        "Start directly with the explanation. Do not open with a preamble such as \
         \"Okay, here's a simplified explanation\" and do not add headings like \
         \"Simple Explanation:\".\n\n",
    );

    prompt.push_str("Patient:\n");
    let _ = writeln!(prompt, "- Name: {}", value(&patient.patient_name));
    let _ = writeln!(prompt, "- Age: {}", value(&patient.age));

    prompt.push_str("\nCBC Results:\n");
    let _ = writeln!(prompt, "- WBC: {}", value(&cbc.total_wbc));
    let _ = writeln!(prompt, "- Neutrophils: {}", value(&cbc.neutrophils));
    let _ = writeln!(prompt, "- Lymphocytes: {}", value(&cbc.lymphocytes));
    let _ = writeln!(prompt, "- Monocytes: {}", value(&cbc.monocytes));
    let _ = writeln!(prompt, "- Eosinophils: {}", value(&cbc.eosinophils));
    let _ = writeln!(prompt, "- Basophils: {}", value(&cbc.basophils));

    prompt.push_str("\nRBC Parameters:\n");
    let _ = writeln!(prompt, "- Hemoglobin: {}", value(&rbc.hemoglobin));
    let _ = writeln!(prompt, "- RBC Count: {}", value(&rbc.rbc_count));
    let _ = writeln!(prompt, "- MCV: {}", value(&rbc.mcv));
    let _ = writeln!(prompt, "- Hematocrit: {}", value(&rbc.hematocrit));
    let _ = writeln!(prompt, "- MCH: {}", value(&rbc.mch));
    let _ = writeln!(prompt, "- MCHC: {}", value(&rbc.mchc));
    let _ = writeln!(prompt, "- RDW: {}", value(&rbc.rdw));
    let _ = writeln!(prompt, "- Platelet Count: {}", value(&rbc.platelet_count));

    prompt.push_str(
        "\nProvide an extremely simple explanation in exactly 5 short sentences using \
         everyday language.\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> StructuredReport {
        let mut report = StructuredReport::default();
        report.patient_information.patient_name = Some("Jane Doe".to_string());
        report.patient_information.age = Some("34".to_string());
        report.patient_information.uhid = Some("UH-778".to_string());
        report.complete_blood_count.total_wbc = Some("7.2".to_string());
        report.hemoglobin_rbc.platelet_count = Some("250".to_string());
        report
    }

    #[test]
    fn test_prompt_embeds_values() {
        let prompt = build_summary_prompt(&sample_report(), "Sinhala");
        assert!(prompt.contains("- Name: Jane Doe\n"));
        assert!(prompt.contains("- Age: 34\n"));
        assert!(prompt.contains("- WBC: 7.2\n"));
        assert!(prompt.contains("- Platelet Count: 250\n"));
    }

    #[test]
    fn test_prompt_marks_absent_fields() {
        let prompt = build_summary_prompt(&StructuredReport::default(), "Sinhala");
        assert!(prompt.contains("- Name: None\n"));
        assert!(prompt.contains("- Neutrophils: None\n"));
        assert!(prompt.contains("- RDW: None\n"));
        assert_eq!(prompt.matches(": None\n").count(), 16);
    }

    #[test]
    fn test_prompt_instructions() {
        let prompt = build_summary_prompt(&sample_report(), "Tamil");
        assert!(prompt.contains("translated into Tamil"));
        assert!(prompt.contains("exactly 5 short sentences"));
        assert!(prompt.contains("Do not open with a preamble"));
    }

    #[test]
    fn test_prompt_excludes_identifiers_outside_template() {
        let prompt = build_summary_prompt(&sample_report(), "Sinhala");
        assert!(!prompt.contains("UH-778"));
    }

    #[test]
    fn test_prompt_field_order_is_fixed() {
        let prompt = build_summary_prompt(&sample_report(), "Sinhala");
        let order = [
            "- Name:", "- Age:", "- WBC:", "- Neutrophils:", "- Lymphocytes:",
            "- Monocytes:", "- Eosinophils:", "- Basophils:", "- Hemoglobin:",
            "- RBC Count:", "- MCV:", "- Hematocrit:", "- MCH:", "- MCHC:", "- RDW:",
            "- Platelet Count:",
        ];
        let positions: Vec<usize> = order.iter().map(|l| prompt.find(l).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let report = sample_report();
        assert_eq!(
            build_summary_prompt(&report, "Sinhala"),
            build_summary_prompt(&report.clone(), "Sinhala")
        );
    }
}
