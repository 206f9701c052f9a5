use anyhow::Result;
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode, Select, Text};
use thiserror::Error;

/// The operator pressed Ctrl-C; the session should end.
#[derive(Debug, Error)]
#[error("session interrupted")]
pub struct Interrupted;

/// Everything the console asks the operator.
pub trait Prompter {
    fn text(&mut self, message: &str) -> Result<String>;
    /// Like `text`, without echoing the input.
    fn secret(&mut self, message: &str) -> Result<String>;
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
    /// `None` when the operator backs out of the selection.
    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>>;
}

/// Terminal prompts. Esc on a text prompt answers with the cancel keyword.
pub struct InquirePrompter {
    cancel_keyword: String,
}

impl InquirePrompter {
    pub fn new(cancel_keyword: impl Into<String>) -> Self {
        Self {
            cancel_keyword: cancel_keyword.into(),
        }
    }

    fn text_result(&self, result: Result<String, InquireError>) -> Result<String> {
        match result {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled) => Ok(self.cancel_keyword.clone()),
            Err(err) => Err(prompt_error(err)),
        }
    }
}

fn prompt_error(err: InquireError) -> anyhow::Error {
    match err {
        InquireError::OperationInterrupted => Interrupted.into(),
        other => anyhow::Error::new(other).context("Prompt failed"),
    }
}

impl Prompter for InquirePrompter {
    fn text(&mut self, message: &str) -> Result<String> {
        self.text_result(Text::new(message).prompt())
    }

    fn secret(&mut self, message: &str) -> Result<String> {
        self.text_result(
            Password::new(message)
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked)
                .prompt(),
        )
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        match Confirm::new(message).with_default(default).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled) => Ok(false),
            Err(err) => Err(prompt_error(err)),
        }
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>> {
        match Select::new(message, options.to_vec())
            .with_help_message("Use arrow keys to navigate, Enter to select")
            .raw_prompt()
        {
            Ok(choice) => Ok(Some(choice.index)),
            Err(InquireError::OperationCanceled) => Ok(None),
            Err(err) => Err(prompt_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_recognisable() {
        let err = prompt_error(InquireError::OperationInterrupted);
        assert!(err.is::<Interrupted>());

        let other = prompt_error(InquireError::NotTTY);
        assert!(!other.is::<Interrupted>());
    }

    #[test]
    fn test_escape_answers_with_cancel_keyword() {
        let prompter = InquirePrompter::new("back");
        assert_eq!(
            prompter.text_result(Err(InquireError::OperationCanceled)).unwrap(),
            "back"
        );
        assert_eq!(prompter.text_result(Ok("u1".to_string())).unwrap(), "u1");
    }
}
