//! Session state: the single, centrally-owned record of what the user sees.
//!
//! Every change goes through [`Session::apply`] with a discrete
//! [`SessionEvent`]. `apply` either performs the whole transition or rejects
//! the event and leaves the state untouched (the one exception is a
//! conversion started with no input, which records the validation message
//! so the user sees it).
//!
//! Invariants kept here:
//! * at most one of file / pasted text is pending (enforced by [`PendingInput`]);
//! * the result is non-empty only after a successful conversion or a later edit;
//! * a new input clears the result, the error and preview mode;
//! * a successful conversion always lands in [`ViewMode::Edit`];
//! * the two writers of the result (conversion completion, committed edits)
//!   never overlap: edits are refused while a conversion is in flight.

use crate::error::Doc2HtmlError;
use crate::pipeline::input::PendingInput;
use crate::progress::STATUS_ANALYZING;
use crate::render::ViewMode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which panel is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    Home,
    Settings,
}

/// Discrete events driving the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TabSelected(Tab),
    InputSelected(PendingInput),
    ConversionStarted,
    StatusChanged(String),
    ConversionSucceeded(String),
    ConversionFailed(String),
    ModeToggled,
    EditCommitted(String),
    CredentialChanged(String),
    /// A user action failed outside a conversion (e.g. a rejected file).
    ErrorRaised(String),
}

/// Transient UI state of one document session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tab: Tab,
    mode: ViewMode,
    input: PendingInput,
    result: String,
    error: Option<String>,
    status: Option<String>,
    in_flight: bool,
    credential: String,
}

impl Session {
    /// Fresh session with a credential loaded from storage.
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            ..Self::default()
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn input(&self) -> &PendingInput {
        &self.input
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Preview only shows anything once there is a result.
    pub fn preview_visible(&self) -> bool {
        self.mode == ViewMode::Preview && !self.result.is_empty()
    }

    /// Apply one event.
    ///
    /// # Errors
    /// * [`Doc2HtmlError::NoInput`]: conversion started with nothing pending
    /// * [`Doc2HtmlError::Busy`]: conversion start, new input or edit while in flight
    /// * [`Doc2HtmlError::InvalidTransition`]: completion events without a
    ///   conversion in flight, edits in preview mode or with no result
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), Doc2HtmlError> {
        debug!("Session event: {}", event_name(&event));
        match event {
            SessionEvent::TabSelected(tab) => {
                self.tab = tab;
            }
            SessionEvent::InputSelected(input) => {
                if self.in_flight {
                    return Err(Doc2HtmlError::Busy);
                }
                self.input = input;
                self.result.clear();
                self.error = None;
                self.mode = ViewMode::Edit;
            }
            SessionEvent::ConversionStarted => {
                if self.in_flight {
                    return Err(Doc2HtmlError::Busy);
                }
                if self.input.is_empty() {
                    self.error = Some(Doc2HtmlError::NoInput.to_string());
                    return Err(Doc2HtmlError::NoInput);
                }
                self.in_flight = true;
                self.error = None;
                self.result.clear();
                self.status = Some(STATUS_ANALYZING.to_string());
                self.mode = ViewMode::Edit;
            }
            SessionEvent::StatusChanged(status) => {
                self.require_in_flight("status update")?;
                self.status = Some(status);
            }
            SessionEvent::ConversionSucceeded(html) => {
                self.require_in_flight("conversion success")?;
                self.result = html;
                self.mode = ViewMode::Edit;
                self.finish();
            }
            SessionEvent::ConversionFailed(message) => {
                self.require_in_flight("conversion failure")?;
                self.result.clear();
                self.error = Some(message);
                self.finish();
            }
            SessionEvent::ModeToggled => {
                self.mode = self.mode.toggled();
            }
            SessionEvent::EditCommitted(markup) => {
                if self.in_flight {
                    return Err(Doc2HtmlError::Busy);
                }
                if self.mode == ViewMode::Preview {
                    return Err(Doc2HtmlError::InvalidTransition(
                        "preview surface is read-only".into(),
                    ));
                }
                if self.result.is_empty() {
                    return Err(Doc2HtmlError::InvalidTransition(
                        "no result to edit".into(),
                    ));
                }
                self.result = markup;
            }
            SessionEvent::CredentialChanged(value) => {
                self.credential = value;
            }
            SessionEvent::ErrorRaised(message) => {
                self.error = Some(message);
            }
        }
        Ok(())
    }

    fn require_in_flight(&self, what: &str) -> Result<(), Doc2HtmlError> {
        if self.in_flight {
            Ok(())
        } else {
            Err(Doc2HtmlError::InvalidTransition(format!(
                "{what} without a conversion in flight"
            )))
        }
    }

    // Loading state is cleared on both completion paths.
    fn finish(&mut self) {
        self.in_flight = false;
        self.status = None;
    }
}

fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::TabSelected(_) => "TabSelected",
        SessionEvent::InputSelected(_) => "InputSelected",
        SessionEvent::ConversionStarted => "ConversionStarted",
        SessionEvent::StatusChanged(_) => "StatusChanged",
        SessionEvent::ConversionSucceeded(_) => "ConversionSucceeded",
        SessionEvent::ConversionFailed(_) => "ConversionFailed",
        SessionEvent::ModeToggled => "ModeToggled",
        SessionEvent::EditCommitted(_) => "EditCommitted",
        SessionEvent::CredentialChanged(_) => "CredentialChanged",
        SessionEvent::ErrorRaised(_) => "ErrorRaised",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> PendingInput {
        PendingInput::PastedText(s.into())
    }

    fn converted(html: &str) -> Session {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text("x"))).unwrap();
        s.apply(SessionEvent::ConversionStarted).unwrap();
        s.apply(SessionEvent::ConversionSucceeded(html.into())).unwrap();
        s
    }

    #[test]
    fn new_input_clears_result_error_and_preview() {
        let mut s = converted("<p>A</p>");
        s.apply(SessionEvent::ModeToggled).unwrap();
        assert!(s.preview_visible());

        s.apply(SessionEvent::InputSelected(text("y"))).unwrap();
        assert_eq!(s.result(), "");
        assert!(s.error().is_none());
        assert_eq!(s.mode(), ViewMode::Edit);
        assert_eq!(s.input(), &text("y"));
    }

    #[test]
    fn start_without_input_records_validation_error() {
        let mut s = Session::default();
        let err = s.apply(SessionEvent::ConversionStarted).unwrap_err();
        assert!(matches!(err, Doc2HtmlError::NoInput));
        assert!(!s.is_loading());
        assert!(s.error().unwrap().contains("No input"));
    }

    #[test]
    fn start_with_empty_text_is_a_validation_error() {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text(""))).unwrap();
        let err = s.apply(SessionEvent::ConversionStarted).unwrap_err();
        assert!(matches!(err, Doc2HtmlError::NoInput));
        assert!(!s.is_loading());
        assert!(s.status().is_none());
        assert_eq!(s.error(), Some(Doc2HtmlError::NoInput.to_string().as_str()));
    }

    #[test]
    fn start_sets_loading_and_first_status() {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text("x"))).unwrap();
        s.apply(SessionEvent::ConversionStarted).unwrap();
        assert!(s.is_loading());
        assert_eq!(s.status(), Some(STATUS_ANALYZING));
    }

    #[test]
    fn second_start_while_in_flight_is_rejected() {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text("x"))).unwrap();
        s.apply(SessionEvent::ConversionStarted).unwrap();
        let err = s.apply(SessionEvent::ConversionStarted).unwrap_err();
        assert!(matches!(err, Doc2HtmlError::Busy));
        assert!(s.is_loading());
    }

    #[test]
    fn success_forces_edit_mode() {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text("x"))).unwrap();
        s.apply(SessionEvent::ModeToggled).unwrap();
        assert_eq!(s.mode(), ViewMode::Preview);
        s.apply(SessionEvent::ConversionStarted).unwrap();
        s.apply(SessionEvent::ModeToggled).unwrap();
        s.apply(SessionEvent::ConversionSucceeded("<p>ok</p>".into()))
            .unwrap();
        assert_eq!(s.mode(), ViewMode::Edit);
        assert!(!s.is_loading());
        assert!(s.status().is_none());
    }

    #[test]
    fn failure_leaves_result_empty_and_ready() {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text("x"))).unwrap();
        s.apply(SessionEvent::ConversionStarted).unwrap();
        s.apply(SessionEvent::ConversionFailed("Conversion error: 500".into()))
            .unwrap();
        assert_eq!(s.result(), "");
        assert_eq!(s.error(), Some("Conversion error: 500"));
        assert!(!s.is_loading());
        assert!(s.status().is_none());
        // input survives so the user can re-trigger
        assert_eq!(s.input(), &text("x"));
    }

    #[test]
    fn completion_without_flight_is_invalid() {
        let mut s = Session::default();
        let err = s
            .apply(SessionEvent::ConversionSucceeded("<p/>".into()))
            .unwrap_err();
        assert!(matches!(err, Doc2HtmlError::InvalidTransition(_)));
        assert_eq!(s.result(), "");
    }

    #[test]
    fn edits_overwrite_and_survive_preview_round_trip() {
        let mut s = converted("<p>A</p>");
        s.apply(SessionEvent::EditCommitted("<p>B</p>".into())).unwrap();
        s.apply(SessionEvent::ModeToggled).unwrap();
        s.apply(SessionEvent::ModeToggled).unwrap();
        assert_eq!(s.result(), "<p>B</p>");
    }

    #[test]
    fn edits_in_preview_are_rejected() {
        let mut s = converted("<p>A</p>");
        s.apply(SessionEvent::ModeToggled).unwrap();
        let err = s
            .apply(SessionEvent::EditCommitted("<p>B</p>".into()))
            .unwrap_err();
        assert!(matches!(err, Doc2HtmlError::InvalidTransition(_)));
        assert_eq!(s.result(), "<p>A</p>");
    }

    #[test]
    fn edit_without_result_is_rejected() {
        let mut s = Session::default();
        assert!(s.apply(SessionEvent::EditCommitted("<p/>".into())).is_err());
    }

    #[test]
    fn preview_needs_result_to_be_visible() {
        let mut s = Session::default();
        s.apply(SessionEvent::ModeToggled).unwrap();
        assert_eq!(s.mode(), ViewMode::Preview);
        assert!(!s.preview_visible());
    }

    #[test]
    fn credential_change_is_immediate() {
        let mut s = Session::new("old");
        s.apply(SessionEvent::CredentialChanged("abc123".into()))
            .unwrap();
        assert_eq!(s.credential(), "abc123");
    }

    #[test]
    fn raised_error_keeps_pending_input() {
        let mut s = Session::default();
        s.apply(SessionEvent::InputSelected(text("x"))).unwrap();
        s.apply(SessionEvent::ErrorRaised("Unsupported file type: a.txt".into()))
            .unwrap();
        assert_eq!(s.error(), Some("Unsupported file type: a.txt"));
        assert_eq!(s.input(), &text("x"));
    }
}
