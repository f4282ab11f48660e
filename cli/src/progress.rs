//! Spinners shown on stderr while a remote call is in flight.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(120);

/// A spinner with `message`, or a hidden bar when `quiet` is set.
///
/// Nothing is drawn when stderr is not a terminal.
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_strings(&[
            "▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸", "▪▪▪▪▪",
        ]));
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(TICK);
    pb
}

/// Run `f` under a spinner, clearing it whatever the outcome.
pub fn with_spinner<T>(message: impl Into<String>, quiet: bool, f: impl FnOnce() -> T) -> T {
    let pb = spinner(message, quiet);
    let result = f();
    pb.finish_and_clear();
    result
}
