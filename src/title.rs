//! Terminal title (§6, component K).
//!
//! Trivial; no teacher analogue needed. Sets the window/tab title via
//! the OSC 2 escape sequence so a user running several launches in
//! different terminals can tell them apart.

use std::io::Write;

/// Sets the terminal title to `roslaunch: <run_id>`, unless
/// `--disable-title` was given or stdout isn't a terminal.
pub fn set(run_id: &str, disabled: bool) {
    if disabled || !is_a_tty() {
        return;
    }
    print!("\x1b]2;roslaunch: {run_id}\x07");
    let _ = std::io::stdout().flush();
}

/// Restores a generic shell title on exit.
pub fn clear(disabled: bool) {
    if disabled || !is_a_tty() {
        return;
    }
    print!("\x1b]2;\x07");
    let _ = std::io::stdout().flush();
}

fn is_a_tty() -> bool {
    // SAFETY: isatty(3) takes a valid fd and has no side effects beyond
    // inspecting kernel tty state.
    unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
}
