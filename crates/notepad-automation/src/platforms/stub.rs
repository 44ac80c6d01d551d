use std::process::Command;

use crate::errors::AutomationError;

pub(crate) fn main_window_for_pid(_pid: u32) -> isize {
    0
}

pub(crate) fn window_title(_hwnd: isize) -> String {
    String::new()
}

pub(crate) fn bring_window_to_front(_hwnd: isize) -> Result<bool, AutomationError> {
    Err(AutomationError::Platform(
        "foreground activation is only supported on Windows".to_string(),
    ))
}

pub(crate) fn detach(_command: &mut Command) {}
