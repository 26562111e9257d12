//! Colored terminal output utilities.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::time::Duration;

use assetline_tasks::{BuildState, Observer, Report, Task, TaskFailure};
use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
    dim: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }
}

/// Progress lines for an orchestrated run.
impl Observer for Output {
    fn state_changed(&self, state: BuildState) {
        match state {
            BuildState::Cleaning => self.info("Cleaning output directory"),
            BuildState::Building => self.info("Building assets"),
            BuildState::Done => self.success("Done"),
            BuildState::Idle | BuildState::Serving | BuildState::Failed => {}
        }
    }

    fn task_finished(&self, task: Task, report: &Report, elapsed: Duration) {
        if task == Task::Clean {
            return;
        }
        let mut line = format!(
            "  {task:<8} {} file(s) in {} ms",
            report.written.len(),
            elapsed.as_millis()
        );
        if !report.skipped.is_empty() {
            let _ = write!(line, ", {} up to date", report.skipped.len());
        }
        self.info(&self.dim.apply_to(line).to_string());
    }

    fn task_failed(&self, failure: &TaskFailure) {
        self.warning(&format!("  {failure}"));
    }

    fn serving(&self, address: SocketAddr) {
        self.highlight(&format!("Serving at http://{address}"));
        self.info("Watching for changes (Ctrl-C to stop)");
    }
}
