//! Short-lived external viewer for each capture.
//!
//! The cycle controller only sees [`Viewer::present`]. What actually puts the
//! image on screen is a [`ViewerLauncher`], so a specific OS utility can be
//! swapped out (or disabled) without touching the loop.

use crate::clock::Clock;
use crate::config::ViewerSettings;
use crate::error::{Error, Result};
use nudgectl_capture::ImageArtifact;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long a viewer gets to exit after a polite termination request.
const TERMINATE_GRACE: Duration = Duration::from_millis(500);
const TERMINATE_POLL: Duration = Duration::from_millis(20);

/// A running viewer that can be closed.
pub trait ViewerProcess {
    /// Close the viewer. Closing one that already exited is not an error.
    fn terminate(self: Box<Self>) -> Result<()>;
}

/// Opens an image file for the user to look at.
pub trait ViewerLauncher {
    fn launch(&self, path: &Path) -> Result<Box<dyn ViewerProcess>>;
}

/// Presents each capture for a fixed duration, best-effort.
pub struct Viewer {
    launcher: Box<dyn ViewerLauncher>,
}

impl Viewer {
    pub fn new(launcher: Box<dyn ViewerLauncher>) -> Self {
        Self { launcher }
    }

    /// Viewer that shows nothing but still honours the display duration.
    pub fn disabled() -> Self {
        Self::new(Box::new(NullLauncher))
    }

    /// Pick a launcher from settings, falling back to a platform default.
    pub fn from_settings(settings: &ViewerSettings) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }
        if let Some(command) = &settings.command {
            if hands_off(command) {
                warn!(
                    "{} hands the image to another program and exits; \
                     its windows will not be closed after the display time",
                    command
                );
            }
            return Self::new(Box::new(CommandLauncher::new(
                command.clone(),
                settings.args.clone(),
            )));
        }
        match CommandLauncher::detect() {
            Some(launcher) => {
                debug!("Using image viewer: {}", launcher.program());
                Self::new(Box::new(launcher))
            }
            None => {
                warn!("No image viewer found on PATH; captures will not be shown");
                Self::disabled()
            }
        }
    }

    /// Show `image` for `duration`, then close the viewer.
    ///
    /// Failures are logged and swallowed; this never aborts the cycle.
    pub fn present(&self, image: &ImageArtifact, duration: Duration, clock: &dyn Clock) {
        let process = match self.launcher.launch(image.path()) {
            Ok(process) => Some(process),
            Err(e) => {
                warn!("Failed to launch image viewer: {}", e);
                None
            }
        };

        clock.sleep(duration);

        if let Some(process) = process {
            if let Err(e) = process.terminate() {
                warn!("Failed to close image viewer: {}", e);
            }
        }
    }
}

/// Launcher that never opens anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLauncher;

struct NullProcess;

impl ViewerProcess for NullProcess {
    fn terminate(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl ViewerLauncher for NullLauncher {
    fn launch(&self, _path: &Path) -> Result<Box<dyn ViewerProcess>> {
        Ok(Box::new(NullProcess))
    }
}

struct Candidate {
    program: &'static str,
    args: &'static [&'static str],
}

#[cfg(target_os = "windows")]
const VIEWER_CANDIDATES: &[Candidate] = &[Candidate {
    program: "mspaint",
    args: &[],
}];

// Quick Look stays in the foreground until closed, unlike `open`
#[cfg(target_os = "macos")]
const VIEWER_CANDIDATES: &[Candidate] = &[Candidate {
    program: "qlmanage",
    args: &["-p"],
}];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const VIEWER_CANDIDATES: &[Candidate] = &[
    Candidate {
        program: "feh",
        args: &[],
    },
    Candidate {
        program: "eog",
        args: &[],
    },
    Candidate {
        program: "display",
        args: &[],
    },
];

/// Launchers that delegate to another process and exit immediately.
const HANDOFF_LAUNCHERS: &[&str] = &[
    "xdg-open", "gio", "gnome-open", "kde-open", "kde-open5", "open", "start", "explorer",
];

/// Whether `program` delegates to a detached viewer we could never close.
pub fn hands_off(program: &str) -> bool {
    let name = Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(program);
    HANDOFF_LAUNCHERS.contains(&name)
}

/// Runs `<program> <args...> <image path>` as a child process.
#[derive(Clone, Debug)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// First platform viewer found on `PATH`.
    pub fn detect() -> Option<Self> {
        VIEWER_CANDIDATES
            .iter()
            .find(|c| which::which(c.program).is_ok())
            .map(|c| Self::new(c.program, c.args.iter().map(|a| a.to_string()).collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ViewerLauncher for CommandLauncher {
    fn launch(&self, path: &Path) -> Result<Box<dyn ViewerProcess>> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Presentation(format!("Failed to start {}: {}", self.program, e)))?;

        debug!("Started viewer {} (pid {})", self.program, child.id());
        Ok(Box::new(ChildViewer { child }))
    }
}

struct ChildViewer {
    child: Child,
}

impl ViewerProcess for ChildViewer {
    fn terminate(self: Box<Self>) -> Result<()> {
        let mut child = self.child;

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Viewer already exited ({})", status);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                return Err(Error::Presentation(format!(
                    "Failed to query viewer state: {}",
                    e
                )))
            }
        }

        if let Err(e) = request_exit(&mut child) {
            debug!("Polite termination failed ({}), killing viewer", e);
        }

        let deadline = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = child.try_wait() {
                return Ok(());
            }
            thread::sleep(TERMINATE_POLL);
        }

        // Still running after the grace period
        if let Err(e) = child.kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(Error::Presentation(format!("Failed to kill viewer: {}", e)));
            }
        }
        child
            .wait()
            .map(|_| ())
            .map_err(|e| Error::Presentation(format!("Failed to reap viewer: {}", e)))
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `pid` belongs to a child we have not reaped yet
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_settings_give_a_null_viewer() {
        let settings = ViewerSettings {
            enabled: false,
            command: Some("feh".to_string()),
            args: vec![],
        };
        let viewer = Viewer::from_settings(&settings);
        let process = viewer.launcher.launch(Path::new("/nonexistent.png")).unwrap();
        assert!(process.terminate().is_ok());
    }

    #[test]
    fn default_candidates_stay_in_the_foreground() {
        assert!(!VIEWER_CANDIDATES.is_empty());
        for candidate in VIEWER_CANDIDATES {
            assert!(!hands_off(candidate.program), "{}", candidate.program);
        }
    }

    #[test]
    fn hand_off_launchers_are_recognised_by_path() {
        assert!(hands_off("xdg-open"));
        assert!(hands_off("/usr/bin/xdg-open"));
        assert!(hands_off("open"));
        assert!(!hands_off("feh"));
        assert!(!hands_off("/usr/bin/eog"));
    }

    #[test]
    fn missing_program_is_a_presentation_error() {
        let launcher = CommandLauncher::new("nudgectl-no-such-viewer", vec![]);
        let err = launcher.launch(Path::new("/tmp/x.png")).err().unwrap();
        assert!(matches!(err, Error::Presentation(_)));
    }
}
