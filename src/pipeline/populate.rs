use crate::extraction::Entity;

use super::schema::StructuredReport;

#[derive(Debug, Clone, Default)]
pub struct Population {
    pub report: StructuredReport,
    pub matched: usize,
    pub unknown_labels: Vec<String>,
}

/// Maps extracted entities onto a fresh report. A later entity for the same
/// field overwrites an earlier one; labels with no field are dropped.
#[tracing::instrument(
    name = "pipeline_stage populate",
    skip(entities),
    fields(
        pipeline.stage = "populate",
        entities.count = entities.len(),
        report.fields_populated,
        report.unknown_labels,
    )
)]
pub fn populate(entities: &[Entity]) -> Population {
    let mut population = Population::default();

    for entity in entities {
        match population.report.slot_mut(&entity.label) {
            Some(slot) => {
                *slot = Some(entity.value.clone());
                population.matched += 1;
            }
            None => population.unknown_labels.push(entity.label.clone()),
        }
    }

    if !population.unknown_labels.is_empty() {
        tracing::debug!(labels = ?population.unknown_labels, "Dropped unknown entity labels");
    }

    let span = tracing::Span::current();
    span.record("report.fields_populated", population.report.populated_fields());
    span.record("report.unknown_labels", population.unknown_labels.len());

    population
}
