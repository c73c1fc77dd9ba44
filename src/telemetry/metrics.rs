use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("lab-report-summarizer"));

// --- Generative-text client ---

pub static GEN_AI_TOKEN_USAGE: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.token.usage")
        .with_description("Number of tokens used per LLM call")
        .with_unit("{token}")
        .build()
});

pub static GEN_AI_OPERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.operation.duration")
        .with_description("Duration of LLM operations in seconds")
        .with_unit("s")
        .build()
});

pub static GEN_AI_RETRY_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("gen_ai.client.retry.count")
        .with_description("Number of LLM call retries")
        .with_unit("{retry}")
        .build()
});

pub static GEN_AI_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("gen_ai.client.error.count")
        .with_description("Number of LLM call errors")
        .with_unit("{error}")
        .build()
});

// --- Document extraction client ---

pub static DOCUMENT_AI_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("document_ai.process.duration")
        .with_description("Duration of document extraction calls in seconds")
        .with_unit("s")
        .build()
});

pub static DOCUMENT_AI_ENTITY_COUNT: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("document_ai.entities")
        .with_description("Number of entities returned per document")
        .with_unit("{entity}")
        .build()
});

pub static DOCUMENT_AI_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("document_ai.error.count")
        .with_description("Number of document extraction errors")
        .with_unit("{error}")
        .build()
});

// --- Domain Metrics ---

pub static LAB_REPORTS_PROCESSED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("lab_report.processed")
        .with_description("Lab reports processed, by outcome")
        .with_unit("{report}")
        .build()
});

pub static LAB_REPORT_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("lab_report.duration")
        .with_description("End-to-end lab report processing duration in seconds")
        .with_unit("s")
        .build()
});

pub static LAB_REPORT_FIELDS_POPULATED: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("lab_report.fields_populated")
        .with_description("Number of schema fields populated per report")
        .with_unit("{field}")
        .build()
});

pub static LAB_REPORT_UNKNOWN_LABELS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("lab_report.unknown_labels")
        .with_description("Extracted entity labels with no schema field")
        .with_unit("{entity}")
        .build()
});

pub static LAB_REPORT_SUMMARY_FALLBACKS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("lab_report.summary.fallback")
        .with_description("Reports returned with the fallback summary")
        .with_unit("{report}")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
        ])
        .build()
});
