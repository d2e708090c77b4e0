//! Master/detail CRUD state
//!
//! Selection state, the button enablement derived from it, and the shared
//! handling of backend replies.

use thiserror::Error;

use crate::api::{ApiResponse, ClientError};
use super::form::FormState;
use super::prompt::Prompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrudState<Id> {
    #[default]
    NoneSelected,
    EditingExisting(Id),
    CreatingNew,
}

impl<Id: Copy> CrudState<Id> {
    pub fn selected_id(&self) -> Option<Id> {
        match self {
            CrudState::EditingExisting(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, CrudState::NoneSelected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStates {
    pub new: bool,
    pub save: bool,
    pub cancel: bool,
    pub delete: bool,
}

impl ButtonStates {
    pub fn for_state<Id>(state: &CrudState<Id>) -> Self {
        match state {
            CrudState::NoneSelected => Self {
                new: true,
                save: false,
                cancel: false,
                delete: false,
            },
            CrudState::EditingExisting(_) => Self {
                new: false,
                save: true,
                cancel: true,
                delete: true,
            },
            CrudState::CreatingNew => Self {
                new: false,
                save: true,
                cancel: true,
                delete: false,
            },
        }
    }
}

/// A controller action that is not available in the current state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrudError {
    #[error("\"{0}\" is not available right now")]
    ActionDisabled(&'static str),
}

/// Result of a user action that talks to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Succeeded {
        message: String,
        redirect_url: Option<String>,
    },
    /// The server answered with a failure status
    Rejected { message: String },
    /// The request or its decoding failed
    TransportFailed { message: String },
    /// The user declined the confirmation
    Declined,
}

impl SubmitOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        SubmitOutcome::Succeeded {
            message: message.into(),
            redirect_url: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded { .. })
    }
}

/// Unpack a backend reply, alerting failures and updating field markings
///
/// On success the payload (if any) and message are returned and the form's
/// markings cleared. Otherwise the alert has been shown and the outcome to
/// report is returned as the error.
pub(crate) fn handle_reply<T, P: Prompter>(
    prompter: &mut P,
    form: Option<&mut FormState>,
    reply: Result<ApiResponse<T>, ClientError>,
) -> Result<(String, Option<T>), SubmitOutcome> {
    match reply {
        Err(e) => {
            tracing::warn!(error = %e, "backend request failed");
            let message = format!("Request failed: {}", e);
            prompter.alert(&message);
            Err(SubmitOutcome::TransportFailed { message })
        }
        Ok(resp) if !resp.is_success() => {
            let message = if resp.message.is_empty() {
                "The operation failed.".to_string()
            } else {
                resp.message
            };
            prompter.alert(&message);
            if let Some(form) = form {
                match &resp.errors {
                    Some(errors) => form.apply_errors(errors),
                    None => form.clear_errors(),
                }
            }
            Err(SubmitOutcome::Rejected { message })
        }
        Ok(resp) => {
            if let Some(form) = form {
                form.clear_errors();
            }
            Ok((resp.message, resp.payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FieldErrors;
    use crate::editor::prompt::testing::RecordingPrompter;

    #[test]
    fn test_buttons_follow_state() {
        let none = ButtonStates::for_state(&CrudState::<i64>::NoneSelected);
        assert!(none.new && !none.save && !none.cancel && !none.delete);

        let editing = ButtonStates::for_state(&CrudState::EditingExisting(3));
        assert!(!editing.new && editing.save && editing.cancel && editing.delete);

        let creating = ButtonStates::for_state(&CrudState::<i64>::CreatingNew);
        assert!(!creating.new && creating.save && creating.cancel && !creating.delete);
    }

    #[test]
    fn test_rejection_applies_field_errors() {
        let mut prompter = RecordingPrompter::accepting();
        let mut form = FormState::new();
        form.apply_errors(&FieldErrors::from([("old".to_string(), vec!["stale".to_string()])]));

        let reply: ApiResponse<()> = ApiResponse::invalid(
            "Validation failed.",
            FieldErrors::from([("price".to_string(), vec!["too low".to_string()])]),
        );
        let outcome = handle_reply(&mut prompter, Some(&mut form), Ok(reply)).unwrap_err();

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected {
                message: "Validation failed.".to_string()
            }
        );
        assert_eq!(prompter.alerts, vec!["Validation failed."]);
        assert!(form.is_invalid("price"));
        assert!(!form.is_invalid("old"));
    }

    #[test]
    fn test_transport_failure_is_alerted_once() {
        let mut prompter = RecordingPrompter::accepting();
        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let outcome = handle_reply::<(), _>(&mut prompter, None, Err(ClientError::Decode(bad_json))).unwrap_err();

        assert!(matches!(outcome, SubmitOutcome::TransportFailed { .. }));
        assert_eq!(prompter.alerts.len(), 1);
    }
}
