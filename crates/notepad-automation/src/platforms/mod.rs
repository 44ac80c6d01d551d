//! Native window calls. Only Windows has a real implementation; other
//! targets report no windows so the core still builds and tests everywhere.

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub(crate) use self::windows::{
    bring_window_to_front, detach, main_window_for_pid, window_title,
};

#[cfg(not(target_os = "windows"))]
mod stub;
#[cfg(not(target_os = "windows"))]
pub(crate) use self::stub::{bring_window_to_front, detach, main_window_for_pid, window_title};
