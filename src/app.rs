//! Session controller: the one place where session events meet side effects.
//!
//! [`Controller`] owns a [`Session`], a [`Converter`] and a credential
//! [`KeyValueStore`]. Each public method maps to one user action (pick a
//! file, paste, convert, toggle preview, commit an edit, change the API key,
//! export). A failed file selection or conversion is recorded on the session
//! as a user-visible message and also returned, so hosts can either read the
//! session or react to the `Result`.

use crate::config::ConversionConfig;
use crate::convert::{conversion_error_message, Converter};
use crate::error::Doc2HtmlError;
use crate::export::{self, ClipboardSink, CopyNotice, DocumentExport};
use crate::output::ConversionStats;
use crate::pipeline::input::{self, PasteEvent, PendingInput};
use crate::pipeline::llm::GenerativeModel;
use crate::render::{self, PreviewOptions, RenderedView};
use crate::session::{Session, SessionEvent, Tab};
use crate::storage::{resolve_api_key, KeyValueStore, CREDENTIAL_KEY};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Drives one document session.
pub struct Controller {
    session: Session,
    converter: Arc<Converter>,
    store: Box<dyn KeyValueStore>,
}

impl Controller {
    /// Create a controller, reading the stored credential once.
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        config: ConversionConfig,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self, Doc2HtmlError> {
        let converter = Arc::new(Converter::new(model, config));
        Self::with_converter(converter, store)
    }

    /// Create a controller around an existing (possibly shared) converter.
    pub fn with_converter(
        converter: Arc<Converter>,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self, Doc2HtmlError> {
        let credential = store.get(CREDENTIAL_KEY)?.unwrap_or_default();
        Ok(Self {
            session: Session::new(credential),
            converter,
            store,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn converter(&self) -> &Arc<Converter> {
        &self.converter
    }

    pub fn select_tab(&mut self, tab: Tab) {
        // Tab changes are always accepted.
        let _ = self.session.apply(SessionEvent::TabSelected(tab));
    }

    /// Select a file through the picker.
    pub fn select_file(&mut self, path: impl AsRef<Path>) -> Result<(), Doc2HtmlError> {
        match input::select_file(path) {
            Ok(pending) => self.select_input(pending),
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Replace the pending input, clearing result, error and preview.
    pub fn select_input(&mut self, pending: PendingInput) -> Result<(), Doc2HtmlError> {
        self.session.apply(SessionEvent::InputSelected(pending))
    }

    /// Handle a paste. Only honoured on the Home tab.
    ///
    /// Returns `true` when the host must suppress its default paste handling.
    pub fn paste(&mut self, event: &PasteEvent) -> Result<bool, Doc2HtmlError> {
        if self.session.tab() != Tab::Home {
            return Ok(false);
        }
        let Some(outcome) = input::read_paste(event, Utc::now()) else {
            return Ok(false);
        };
        self.select_input(outcome.input)?;
        Ok(outcome.suppress_default)
    }

    /// Run a conversion of the pending input.
    ///
    /// On success the result is stored (read it through [`Controller::session`])
    /// and Edit mode is active. On failure
    /// the result is empty and the session error reads
    /// `"Conversion error: <cause>"`. Loading state is cleared either way.
    pub async fn convert(&mut self) -> Result<ConversionStats, Doc2HtmlError> {
        self.session.apply(SessionEvent::ConversionStarted)?;

        let pending = self.session.input().clone();
        let api_key = resolve_api_key(
            self.session.credential(),
            self.converter.config().api_key.as_deref(),
        );
        let converter = Arc::clone(&self.converter);
        let session = &mut self.session;

        let outcome = converter
            .convert_with_status(&pending, &api_key, |status| {
                // Only fails when no conversion is in flight, which cannot
                // happen between ConversionStarted and completion.
                let _ = session.apply(SessionEvent::StatusChanged(status.to_string()));
            })
            .await;

        match outcome {
            Ok(output) => {
                self.session
                    .apply(SessionEvent::ConversionSucceeded(output.html))?;
                Ok(output.stats)
            }
            Err(e) => {
                self.session
                    .apply(SessionEvent::ConversionFailed(conversion_error_message(&e)))?;
                Err(e)
            }
        }
    }

    /// Flip between Edit and Preview.
    pub fn toggle_mode(&mut self) {
        let _ = self.session.apply(SessionEvent::ModeToggled);
    }

    /// Commit the editable surface's markup as the new result.
    pub fn commit_edit(&mut self, markup: impl Into<String>) -> Result<(), Doc2HtmlError> {
        self.session.apply(SessionEvent::EditCommitted(markup.into()))
    }

    /// Update the credential and persist it immediately.
    pub fn change_credential(&mut self, value: impl Into<String>) -> Result<(), Doc2HtmlError> {
        let value = value.into();
        self.store.set(CREDENTIAL_KEY, &value)?;
        self.session.apply(SessionEvent::CredentialChanged(value))?;
        info!("Credential updated");
        Ok(())
    }

    /// Use `value` as the credential for this session without storing it.
    pub fn use_credential_for_session(
        &mut self,
        value: impl Into<String>,
    ) -> Result<(), Doc2HtmlError> {
        self.session.apply(SessionEvent::CredentialChanged(value.into()))
    }

    /// Render the current result in the current mode.
    pub fn render(&self, options: &PreviewOptions) -> RenderedView {
        render::render(self.session.result(), self.session.mode(), options)
    }

    /// Prepare the `.doc` download. `None` when there is nothing to export.
    pub fn document_export(&self, surface: Option<&str>) -> Option<DocumentExport> {
        export::prepare_document(
            self.session.result(),
            surface,
            self.session.input().display_name(),
        )
    }

    /// Save the `.doc` into `dir`. A no-op (`Ok(None)`) without content.
    pub fn export_document(
        &self,
        dir: impl AsRef<Path>,
        surface: Option<&str>,
    ) -> Result<Option<PathBuf>, Doc2HtmlError> {
        match self.document_export(surface) {
            Some(doc) => doc.save_to(dir).map(Some),
            None => Ok(None),
        }
    }

    /// Copy the current content to `sink`; the notice is what the user sees.
    pub fn copy(&self, surface: Option<&str>, sink: &mut dyn ClipboardSink) -> CopyNotice {
        export::copy_to_clipboard(self.session.result(), surface, sink)
    }

    fn record_error(&mut self, e: &Doc2HtmlError) {
        warn!("{}", e);
        let _ = self.session.apply(SessionEvent::ErrorRaised(e.to_string()));
    }
}
