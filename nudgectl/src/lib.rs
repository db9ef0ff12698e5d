//! `nudgectl` watches the screen and suggests the next step toward a goal.
//!
//! Every cycle it captures the primary display, sends the screenshot and the
//! user's goal to a vision-capable LLM, briefly shows the capture in an
//! external viewer, surfaces the model's one-sentence answer, deletes the
//! capture and sleeps until the next cycle is due.
//!
//! # Core Components
//! - [`cycle::CycleController`]: the loop, its state machine and cadence.
//! - [`llm::LlmClient`]: OpenAI-compatible chat completion client ([`Advisor`]).
//! - [`viewer::Viewer`]: timed external image viewer.
//! - [`notice`]: modal or console presentation of the suggestion.
//! - [`config::Config`]: TOML configuration file.

pub mod clock;
pub mod config;
pub mod cycle;
mod error;
pub mod llm;
pub mod notice;
pub mod viewer;

pub use error::{Error, Result, Severity};

pub use clock::{Clock, StopSignal, SystemClock};
pub use config::{Config, CycleSettings, LlmSettings, ViewerSettings};
pub use cycle::{
    resolve_goal, CycleConfig, CycleController, CycleObserver, CycleOutcome, CycleState,
    StopReason, DEFAULT_GOAL, FALLBACK_SUGGESTION,
};
pub use llm::{Advisor, LlmClient, LlmConfig, Suggestion};
pub use notice::{default_notifier, ConsoleNotifier, Notifier};
pub use viewer::{CommandLauncher, NullLauncher, Viewer, ViewerLauncher, ViewerProcess};

pub use nudgectl_capture::{Capturer, ImageArtifact, ScreenCapturer};
