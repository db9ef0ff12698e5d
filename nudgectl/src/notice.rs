//! Surfacing the suggestion to the user.

use crate::error::{Error, Result};
use std::io::Write;

/// Shows one suggestion and blocks until the user has seen it.
pub trait Notifier {
    fn notify(&self, suggestion: &str) -> Result<()>;
}

/// Prints `[AI] <suggestion>` to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, suggestion: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "[AI] {}", suggestion)
            .and_then(|_| out.flush())
            .map_err(|e| Error::Presentation(format!("Failed to write suggestion: {}", e)))
    }
}

/// Modal info dialog that waits for the user to press OK.
#[cfg(feature = "desktop")]
#[derive(Clone, Debug)]
pub struct DialogNotifier {
    title: String,
}

#[cfg(feature = "desktop")]
impl DialogNotifier {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[cfg(feature = "desktop")]
impl Default for DialogNotifier {
    fn default() -> Self {
        Self::new("AI Suggestion")
    }
}

#[cfg(feature = "desktop")]
impl Notifier for DialogNotifier {
    fn notify(&self, suggestion: &str) -> Result<()> {
        use rfd::{MessageButtons, MessageDialog, MessageLevel};
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let dialog = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(self.title.as_str())
            .set_description(suggestion)
            .set_buttons(MessageButtons::Ok);

        // GUI backends can panic when no display server is reachable
        catch_unwind(AssertUnwindSafe(move || {
            let _ = dialog.show();
        }))
        .map_err(|_| Error::Presentation("Suggestion dialog could not be shown".to_string()))
    }
}

/// Dialog when built with desktop support, console otherwise.
pub fn default_notifier() -> Box<dyn Notifier> {
    #[cfg(feature = "desktop")]
    {
        Box::new(DialogNotifier::default())
    }
    #[cfg(not(feature = "desktop"))]
    {
        Box::new(ConsoleNotifier)
    }
}
