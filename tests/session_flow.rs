//! Session flow tests: a [`Controller`] driven the way a host would drive it,
//! against a fake model that counts calls and can be held mid-flight.

use async_trait::async_trait;
use edgequake_doc2html::convert::CONVERSION_ERROR_PREFIX;
use edgequake_doc2html::pipeline::llm::{ContentPart, GenerateRequest, GenerateResponse};
use edgequake_doc2html::progress::{STATUS_ANALYZING, STATUS_FORMATTING};
use edgequake_doc2html::storage::CREDENTIAL_KEY;
use edgequake_doc2html::{
    ClipboardItem, ClipboardSink, ConversionConfig, ConversionProgressCallback, Controller,
    Converter, CopyNotice, Doc2HtmlError, FileStore, GenerativeModel, KeyValueStore, MemoryStore,
    PasteEvent, PasteTarget, PendingInput, PreviewOptions, ViewMode,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Replies with a fixed string (or error) and records every call.
struct CountingModel {
    reply: Result<String, String>,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
    requests: Mutex<Vec<GenerateRequest>>,
    /// When set, each call waits here until released.
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl CountingModel {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self::new(Ok(text.into()), None))
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self::new(Err(message.into()), None))
    }

    fn gated(text: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self::new(Ok(text.into()), Some(gate)))
    }

    fn new(reply: Result<String, String>, gate: Option<Arc<Notify>>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            gate,
            entered: Arc::new(Notify::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for CountingModel {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, Doc2HtmlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(api_key.to_string());
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.notified().await;
        }

        match &self.reply {
            Ok(text) => Ok(GenerateResponse {
                text: text.clone(),
                ..Default::default()
            }),
            Err(message) => Err(Doc2HtmlError::ApiError {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    writes: Vec<(String, String)>,
}

impl ClipboardSink for RecordingSink {
    fn write(&mut self, html: &str, plain: &str) -> Result<(), Doc2HtmlError> {
        self.writes.push((html.to_string(), plain.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct StatusLog(Mutex<Vec<String>>);

impl ConversionProgressCallback for StatusLog {
    fn on_status(&self, status: &str) {
        self.0.lock().unwrap().push(status.to_string());
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn controller_with(model: Arc<CountingModel>, credential: &str) -> Controller {
    let mut store = MemoryStore::new();
    store.set(CREDENTIAL_KEY, credential).unwrap();
    Controller::new(model, ConversionConfig::default(), Box::new(store)).unwrap()
}

fn text_paste(text: &str) -> PasteEvent {
    PasteEvent {
        items: vec![ClipboardItem::Text(text.into())],
        target: PasteTarget::Surface,
    }
}

fn image_paste(bytes: &[u8]) -> PasteEvent {
    PasteEvent {
        items: vec![ClipboardItem::Image(bytes.to_vec())],
        target: PasteTarget::Surface,
    }
}

// ── Input selection ──────────────────────────────────────────────────────────

#[tokio::test]
async fn later_text_paste_replaces_pasted_image() {
    let model = CountingModel::replying("<p>ok</p>");
    let mut c = controller_with(model.clone(), "key");

    assert!(c.paste(&image_paste(b"\x89PNG")).unwrap());
    assert!(matches!(c.session().input(), PendingInput::FileBlob(_)));

    assert!(!c.paste(&text_paste("Câu 2")).unwrap());
    assert_eq!(c.session().input(), &PendingInput::PastedText("Câu 2".into()));

    c.convert().await.unwrap();
    let requests = model.requests.lock().unwrap();
    assert!(matches!(requests[0].parts[0], ContentPart::Text { .. }));
}

#[tokio::test]
async fn image_paste_is_sent_as_png_inline_data() {
    let model = CountingModel::replying("<p>ok</p>");
    let mut c = controller_with(model.clone(), "key");

    c.paste(&image_paste(b"\x89PNG\r\n")).unwrap();
    let name = c.session().input().display_name().unwrap().to_string();
    assert!(name.starts_with("Pasted_Image_") && name.ends_with(".png"));

    c.convert().await.unwrap();
    let requests = model.requests.lock().unwrap();
    match &requests[0].parts[0] {
        ContentPart::InlineData { inline_data } => {
            assert_eq!(inline_data.mime_type, "image/png");
            assert_eq!(inline_data.data, "iVBORw0K");
        }
        other => panic!("expected inline data, got {other:?}"),
    }
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_without_input_never_calls_model() {
    let model = CountingModel::replying("<p>x</p>");
    let mut c = controller_with(model.clone(), "key");

    let err = c.convert().await.unwrap_err();
    assert!(matches!(err, Doc2HtmlError::NoInput));
    assert_eq!(model.calls(), 0);
    assert!(c.session().error().is_some());
    assert!(!c.session().is_loading());
}

#[tokio::test]
async fn empty_text_never_starts_conversion() {
    let model = CountingModel::replying("<p>x</p>");
    let mut c = controller_with(model.clone(), "key");

    c.select_input(PendingInput::PastedText(String::new()))
        .unwrap();
    let err = c.convert().await.unwrap_err();

    assert!(matches!(err, Doc2HtmlError::NoInput));
    assert_eq!(model.calls(), 0);
    assert!(!c.session().is_loading());
    let message = c.session().error().unwrap();
    assert_eq!(message, Doc2HtmlError::NoInput.to_string());
    assert!(!message.starts_with(CONVERSION_ERROR_PREFIX));
}

#[tokio::test]
async fn success_lands_in_edit_mode_with_sanitized_html() {
    let model = CountingModel::replying("```html\n<p>Câu 1: $x^2$</p>\n```");
    let mut c = controller_with(model.clone(), "key");

    c.select_input(PendingInput::PastedText("Câu 1: x^2".into()))
        .unwrap();
    c.toggle_mode();
    assert_eq!(c.session().mode(), ViewMode::Preview);

    c.convert().await.unwrap();
    assert_eq!(c.session().result(), "<p>Câu 1: $x^2$</p>");
    assert_eq!(c.session().mode(), ViewMode::Edit);
    assert!(c.session().status().is_none());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn failure_reports_prefixed_message_and_empty_result() {
    let model = CountingModel::failing("quota exceeded");
    let mut c = controller_with(model.clone(), "key");

    c.select_input(PendingInput::PastedText("x".into())).unwrap();
    assert!(c.convert().await.is_err());

    let error = c.session().error().unwrap();
    assert!(error.starts_with(CONVERSION_ERROR_PREFIX));
    assert!(error.contains("quota exceeded"));
    assert_eq!(c.session().result(), "");
    assert!(!c.session().is_loading());

    // The input survives, so the user can simply retry.
    assert!(c.convert().await.is_err());
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn statuses_reach_progress_callback_in_order() {
    let log = Arc::new(StatusLog::default());
    let config = ConversionConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let model = CountingModel::replying("<p>ok</p>");
    let mut c = Controller::new(model, config, Box::new(MemoryStore::new())).unwrap();

    c.change_credential("key").unwrap();
    c.select_input(PendingInput::PastedText("x".into())).unwrap();
    c.convert().await.unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        vec![STATUS_ANALYZING.to_string(), STATUS_FORMATTING.to_string()]
    );
}

#[tokio::test]
async fn second_conversion_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let model = CountingModel::gated("<p>ok</p>", gate.clone());
    let converter = Arc::new(Converter::new(model.clone(), ConversionConfig::default()));

    let first = {
        let converter = converter.clone();
        tokio::spawn(async move {
            converter
                .convert(&PendingInput::PastedText("a".into()), "key")
                .await
        })
    };
    model.entered.notified().await;
    assert!(converter.is_busy());

    let err = converter
        .convert(&PendingInput::PastedText("b".into()), "key")
        .await
        .unwrap_err();
    assert!(matches!(err, Doc2HtmlError::Busy));

    gate.notify_one();
    let output = first.await.unwrap().unwrap();
    assert_eq!(output.html, "<p>ok</p>");
    assert_eq!(model.calls(), 1);
    assert!(!converter.is_busy());
}

// ── Edit / preview ───────────────────────────────────────────────────────────

#[tokio::test]
async fn committed_edit_survives_preview_round_trip() {
    let model = CountingModel::replying("<p>A</p>");
    let mut c = controller_with(model, "key");
    c.select_input(PendingInput::PastedText("x".into())).unwrap();
    c.convert().await.unwrap();

    c.commit_edit("<p>B</p>").unwrap();
    c.toggle_mode();
    let preview = c.render(&PreviewOptions::default());
    assert!(!preview.editable);
    assert_eq!(preview.markup, "<p>B</p>");
    assert!(preview.typeset.is_some());

    c.toggle_mode();
    let edit = c.render(&PreviewOptions::default());
    assert!(edit.editable);
    assert_eq!(edit.markup, "<p>B</p>");
}

#[tokio::test]
async fn new_input_clears_previous_result() {
    let model = CountingModel::replying("<p>A</p>");
    let mut c = controller_with(model, "key");
    c.select_input(PendingInput::PastedText("x".into())).unwrap();
    c.convert().await.unwrap();
    c.toggle_mode();

    c.paste(&text_paste("y")).unwrap();
    assert_eq!(c.session().result(), "");
    assert_eq!(c.session().mode(), ViewMode::Edit);
    assert!(c.session().error().is_none());
}

// ── Exports ──────────────────────────────────────────────────────────────────

#[test]
fn exports_with_no_result_do_nothing() {
    let c = controller_with(CountingModel::replying(""), "key");

    assert!(c.document_export(None).is_none());

    let mut sink = RecordingSink::default();
    let notice = c.copy(None, &mut sink);
    assert_eq!(notice, CopyNotice::NothingToCopy);
    assert!(sink.writes.is_empty());
}

#[tokio::test]
async fn exports_use_live_surface_and_input_name() {
    let dir = tempfile::tempdir().unwrap();
    let scan = dir.path().join("exam.v2.png");
    std::fs::write(&scan, b"\x89PNG").unwrap();

    let model = CountingModel::replying("<p>A</p>");
    let mut c = controller_with(model, "key");
    c.select_file(&scan).unwrap();
    c.convert().await.unwrap();

    let out = dir.path().join("out");
    let path = c
        .export_document(&out, Some("<p>edited</p>"))
        .unwrap()
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "Converted_exam.doc");
    let doc = std::fs::read_to_string(path).unwrap();
    assert!(doc.contains("<body><p>edited</p></body>"));

    let mut sink = RecordingSink::default();
    assert_eq!(c.copy(None, &mut sink), CopyNotice::Copied);
    assert_eq!(sink.writes, vec![("<p>A</p>".to_string(), "A".to_string())]);
}

// ── Credential ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn credential_is_persisted_and_used_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("storage.json");
    let model = CountingModel::replying("<p>ok</p>");

    let mut c = Controller::new(
        model.clone(),
        ConversionConfig::default(),
        Box::new(FileStore::new(&store_path)),
    )
    .unwrap();
    c.change_credential("abc123").unwrap();

    let reopened = FileStore::new(&store_path);
    assert_eq!(
        reopened.get(CREDENTIAL_KEY).unwrap().as_deref(),
        Some("abc123")
    );

    c.select_input(PendingInput::PastedText("x".into())).unwrap();
    c.convert().await.unwrap();
    assert_eq!(*model.keys.lock().unwrap(), vec!["abc123".to_string()]);

    let again = Controller::new(
        model,
        ConversionConfig::default(),
        Box::new(FileStore::new(&store_path)),
    )
    .unwrap();
    assert_eq!(again.session().credential(), "abc123");
}

#[tokio::test]
async fn session_credential_beats_stored_key_without_persisting() {
    let model = CountingModel::replying("<p>ok</p>");
    let mut c = controller_with(model.clone(), "stale");

    c.use_credential_for_session("fresh").unwrap();
    c.select_input(PendingInput::PastedText("x".into())).unwrap();
    c.convert().await.unwrap();

    assert_eq!(*model.keys.lock().unwrap(), vec!["fresh".to_string()]);
    assert_eq!(
        c.store().get(CREDENTIAL_KEY).unwrap().as_deref(),
        Some("stale")
    );
}
