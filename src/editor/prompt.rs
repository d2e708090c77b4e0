//! User prompts
//!
//! Blocking alert and confirmation dialogs, abstracted so controllers can run
//! headless.

pub trait Prompter: Send {
    fn alert(&mut self, message: &str);

    /// Returns true when the user accepts
    fn confirm(&mut self, message: &str) -> bool;
}

/// Logs alerts and accepts every confirmation
#[derive(Debug, Default)]
pub struct LogPrompter;

impl Prompter for LogPrompter {
    fn alert(&mut self, message: &str) {
        tracing::info!(target: "bakecost::prompt", "{}", message);
    }

    fn confirm(&mut self, message: &str) -> bool {
        tracing::info!(target: "bakecost::prompt", "confirmed: {}", message);
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Prompter;

    /// Records every prompt and answers confirmations with `answer`
    #[derive(Debug)]
    pub struct RecordingPrompter {
        pub alerts: Vec<String>,
        pub confirms: Vec<String>,
        pub answer: bool,
    }

    impl RecordingPrompter {
        pub fn accepting() -> Self {
            Self {
                alerts: Vec::new(),
                confirms: Vec::new(),
                answer: true,
            }
        }

        pub fn declining() -> Self {
            Self {
                answer: false,
                ..Self::accepting()
            }
        }
    }

    impl Prompter for RecordingPrompter {
        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }

        fn confirm(&mut self, message: &str) -> bool {
            self.confirms.push(message.to_string());
            self.answer
        }
    }
}
