//! End-to-end integration tests for edgequake-invoice2json.
//!
//! The first group runs everywhere: it drives the public API on canned model
//! replies and temporary files, with no pdfium and no network.
//!
//! The live group uses real invoices in `./test_cases/` and makes LLM API
//! calls. It is gated behind the `E2E_ENABLED` environment variable so it
//! does not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 OPENAI_API_KEY=sk-... cargo test --test e2e -- --nocapture
//!
//! Expected fixtures:
//!   test_cases/invoice_text.pdf     — invoice with a real text layer
//!   test_cases/invoice_scanned.pdf  — image-only (scanned) invoice

use edgequake_invoice2json::{
    extract, extract_from_bytes, extract_sync, extract_to_file, interpret_response, write_result,
    ExtractError, ExtractionConfig, ExtractionMode, ExtractionProgressCallback, FieldValue,
    NoopProgressCallback, ParseOutcome, ProviderKind, Stage, CANONICAL_SCHEMA,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Route library logs to the test harness (`--nocapture` shows them).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("edgequake_invoice2json=debug"))
        .with_test_writer()
        .try_init();
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Every section and field of the canonical schema is present, and every
/// value is a string, a number or a boolean.
fn assert_canonical_shape(json: &Value, context: &str) {
    let root = json
        .as_object()
        .unwrap_or_else(|| panic!("[{context}] top level must be an object"));
    assert_eq!(root.len(), 7, "[{context}] expected 7 sections");

    for section in CANONICAL_SCHEMA.sections() {
        let obj = root
            .get(section.name)
            .and_then(Value::as_object)
            .unwrap_or_else(|| panic!("[{context}] missing section {}", section.name));
        assert_eq!(
            obj.len(),
            section.fields.len(),
            "[{context}] section {} has extra or missing fields",
            section.name
        );
        for name in section.field_names() {
            let v = obj
                .get(name)
                .unwrap_or_else(|| panic!("[{context}] missing {}.{}", section.name, name));
            assert!(
                v.is_string() || v.is_number() || v.is_boolean(),
                "[{context}] {}.{} is not a scalar: {v}",
                section.name,
                name
            );
        }
    }
}

// ── Reply interpretation (no LLM, instant) ───────────────────────────────────

#[test]
fn test_missing_section_is_filled_with_empty_strings() {
    let raw = r#"{
        "order_metadata": {"order_id": "INV-00042", "order_date": "Mar 5, 2024"},
        "patient_information": {"patient_first_name": "  Ada ", "patient_dob": "07/04/1961"}
    }"#;

    let (result, outcome) = interpret_response(raw, &CANONICAL_SCHEMA);
    assert_eq!(outcome, ParseOutcome::Direct);

    let json = result.to_value();
    assert_canonical_shape(&json, "missing_clinical");

    for field in [
        "patient_allergies",
        "patient_diseases",
        "patient_medication_history",
        "patient_encounters",
    ] {
        assert_eq!(json["clinical"][field], "", "clinical.{field} should be empty");
    }

    assert_eq!(json["order_metadata"]["order_date"], "2024-03-05");
    assert_eq!(json["patient_information"]["patient_first_name"], "Ada");
    assert_eq!(json["patient_information"]["patient_dob"], "1961-07-04");
}

#[test]
fn test_fenced_reply_is_recovered() {
    let raw = "```json\n{\"medication_prescription_data\": {\"unit_price\": \"$1,250.50\", \"days_supply\": 30}}\n```";

    let (result, outcome) = interpret_response(raw, &CANONICAL_SCHEMA);
    assert_eq!(outcome, ParseOutcome::FenceStripped);
    assert_eq!(
        result.get("medication_prescription_data", "unit_price"),
        Some(&FieldValue::Text("1250.50".into()))
    );
    // JSON numbers are kept as numbers.
    assert_eq!(
        result.to_value()["medication_prescription_data"]["days_supply"],
        30
    );
}

#[test]
fn test_garbage_reply_yields_empty_record() {
    let (result, outcome) = interpret_response("not json at all", &CANONICAL_SCHEMA);
    assert_eq!(outcome, ParseOutcome::Unparseable);
    assert_eq!(result.filled_count(), 0);
    assert_eq!(result.field_count(), 99);
    assert_canonical_shape(&result.to_value(), "garbage");
}

#[test]
fn test_non_object_reply_yields_empty_record() {
    let (result, outcome) = interpret_response("[1, 2, 3]", &CANONICAL_SCHEMA);
    assert_eq!(outcome, ParseOutcome::Direct);
    assert_eq!(result.filled_count(), 0);
}

#[test]
fn test_interpretation_is_idempotent() {
    let raw = r#"{"shipping_delivery": {"ship_date": "2024/01/09", "shipping_zip": "02139"}}"#;
    let (first, _) = interpret_response(raw, &CANONICAL_SCHEMA);
    let again = first.to_json_pretty().unwrap();
    let (second, _) = interpret_response(&again, &CANONICAL_SCHEMA);
    assert_eq!(first, second);
}

// ── Output file (no LLM) ─────────────────────────────────────────────────────

#[test]
fn test_write_result_pretty_schema_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("invoice_payload.json");
    let (result, _) = interpret_response(
        r#"{"clinical": {"patient_allergies": "Penicillin"}}"#,
        &CANONICAL_SCHEMA,
    );

    write_result(&out, &result).expect("write should succeed");

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("{\n  \"order_metadata\": {\n    \"order_id\": \"\","));
    assert!(text.contains("\"patient_allergies\": \"Penicillin\""));

    let order: Vec<usize> = CANONICAL_SCHEMA
        .sections()
        .iter()
        .map(|s| text.find(&format!("\"{}\"", s.name)).expect("section present"))
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "sections out of order");

    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_canonical_shape(&parsed, "written_file");
}

#[test]
fn test_write_result_into_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a/b/c/out.json");
    let (result, _) = interpret_response("{}", &CANONICAL_SCHEMA);
    write_result(&out, &result).expect("parent directories are created");
    assert!(out.exists());
}

// ── Input validation (no LLM) ────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_nonexistent_file() {
    let err = extract("/definitely/not/a/real/invoice.pdf", &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }), "got {err}");
}

#[test]
fn test_extract_from_bytes_rejects_non_pdf() {
    let config = ExtractionConfig::default();
    let err = tokio_test::block_on(extract_from_bytes(b"<html>not an invoice</html>", &config))
        .unwrap_err();
    assert!(matches!(err, ExtractError::NotAPdf { .. }), "got {err}");
}

#[test]
fn test_unknown_provider_is_rejected_before_any_call() {
    let err = "anthropic".parse::<ProviderKind>().unwrap_err();
    assert!(matches!(err, ExtractError::UnknownProvider { .. }));
    assert!(err.to_string().contains("openai, vertex"));
}

// ── Progress callback (no LLM) ───────────────────────────────────────────────

/// `Arc<dyn ExtractionProgressCallback>` can be moved into a spawned task.
#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    struct StageLogger {
        log: Arc<Mutex<Vec<Stage>>>,
    }

    impl ExtractionProgressCallback for StageLogger {
        fn on_stage(&self, stage: Stage) {
            self.log.lock().unwrap().push(stage);
        }
    }

    let log = Arc::new(Mutex::new(vec![]));
    let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(StageLogger {
        log: Arc::clone(&log),
    });

    tokio::spawn(async move {
        cb.on_stage(Stage::ReadingText);
        cb.on_stage(Stage::QueryingModel);
    })
    .await
    .expect("spawn must succeed");

    assert_eq!(
        *log.lock().unwrap(),
        vec![Stage::ReadingText, Stage::QueryingModel]
    );
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();

    let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
    cb.on_stage(Stage::Normalizing);
    cb.on_complete(0, 99);
}

// ── Live extraction tests (need pdfium + LLM API) ────────────────────────────

/// A text-layer invoice goes through text mode and fills some fields.
#[tokio::test]
async fn test_extract_text_invoice() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice_text.pdf"));
    let out_path = output_dir().join("invoice_text.json");

    let config = ExtractionConfig::default();
    let output = extract_to_file(&path, &out_path, &config)
        .await
        .expect("extraction should succeed");

    assert_eq!(output.mode, ExtractionMode::Text);
    assert_eq!(output.stats.images_sent, 0);
    assert!(output.stats.avg_chars_per_page > 300.0);
    assert!(output.stats.input_tokens > 0, "Should have consumed tokens");
    assert!(output.stats.filled_fields > 0, "Some fields should be filled");

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_canonical_shape(&written, "invoice_text");

    println!("[invoice_text] Saved to {}", out_path.display());
    println!(
        "[invoice_text] {}/{} fields, {} in / {} out tokens",
        output.stats.filled_fields,
        output.stats.total_fields,
        output.stats.input_tokens,
        output.stats.output_tokens
    );
}

/// The full pipeline on a real PDF with a canned model reply: no API key.
#[tokio::test]
async fn test_extract_text_invoice_with_canned_reply() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice_text.pdf"));

    let mock = edgequake_llm::MockProvider::new();
    mock.add_response(
        r#"{"order_metadata": {"order_id": "INV-1", "order_date": "Mar 5, 2024"}, "extra": {}}"#,
    )
    .await;

    let config = ExtractionConfig::builder()
        .provider(Arc::new(mock))
        .build()
        .expect("valid config");

    let output = extract(&path, &config)
        .await
        .expect("extraction should succeed");

    assert_eq!(output.mode, ExtractionMode::Text);
    assert_eq!(output.stats.images_sent, 0);
    assert_eq!(output.stats.parse_outcome, ParseOutcome::Direct);
    assert_eq!(
        output.result.get("order_metadata", "order_id"),
        Some(&FieldValue::Text("INV-1".into()))
    );
    assert_eq!(
        output.result.get("order_metadata", "order_date"),
        Some(&FieldValue::Text("2024-03-05".into()))
    );
    assert_eq!(output.stats.filled_fields, 2);

    let json = output.result.to_value();
    assert!(json.get("extra").is_none());
    assert_canonical_shape(&json, "invoice_text_canned");
}

/// A scanned invoice switches to vision mode and sends one image per page.
#[tokio::test]
async fn test_extract_scanned_invoice_vision() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice_scanned.pdf"));

    let config = ExtractionConfig::builder()
        .model("gpt-4o")
        .build()
        .expect("valid config");

    let output = extract(&path, &config)
        .await
        .expect("extraction should succeed");

    assert_eq!(output.mode, ExtractionMode::Vision);
    assert_eq!(output.stats.images_sent, output.stats.page_count);
    assert_canonical_shape(&output.result.to_value(), "invoice_scanned");

    std::fs::write(
        output_dir().join("invoice_scanned.json"),
        output.result.to_json_pretty().unwrap(),
    )
    .ok();
}

/// With vision disabled a scanned invoice still completes on its sparse text.
#[test]
fn test_extract_scanned_invoice_no_vision_sync() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice_scanned.pdf"));

    let config = ExtractionConfig::builder()
        .allow_vision(false)
        .build()
        .expect("valid config");

    let output = extract_sync(&path, &config).expect("extraction should succeed");

    assert_eq!(output.mode, ExtractionMode::SparseText);
    assert_eq!(output.stats.images_sent, 0);
    assert_canonical_shape(&output.result.to_value(), "invoice_scanned_no_vision");
}

/// Vertex AI, only when a GCP project is configured.
#[tokio::test]
async fn test_extract_text_invoice_vertex() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice_text.pdf"));
    if std::env::var("GOOGLE_CLOUD_PROJECT").is_err() {
        println!("SKIP — set GOOGLE_CLOUD_PROJECT to run Vertex e2e tests");
        return;
    }

    let config = ExtractionConfig::builder()
        .provider_kind(ProviderKind::Vertex)
        .model("gemini-1.5-flash")
        .build()
        .expect("valid config");

    let output = extract(&path, &config)
        .await
        .expect("extraction should succeed");
    assert_canonical_shape(&output.result.to_value(), "invoice_text_vertex");
}
