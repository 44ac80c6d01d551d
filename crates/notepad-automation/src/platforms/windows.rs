use std::os::windows::process::CommandExt;
use std::process::Command;
use windows::Win32::Foundation::HWND;
use windows::Win32::System::Threading::{
    AttachThreadInput, GetCurrentThreadId, CREATE_NEW_PROCESS_GROUP, DETACHED_PROCESS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, GetForegroundWindow, GetTopWindow, GetWindow, GetWindowTextW,
    GetWindowThreadProcessId, IsIconic, IsWindowVisible, SetForegroundWindow, ShowWindow,
    GW_HWNDNEXT, GW_OWNER, SW_RESTORE, SW_SHOW,
};

use crate::errors::AutomationError;

/// First visible, unowned top-level window of `pid` in Z-order, or 0.
pub(crate) fn main_window_for_pid(pid: u32) -> isize {
    unsafe {
        let mut hwnd = match GetTopWindow(HWND::default()) {
            Ok(h) => h,
            Err(_) => return 0,
        };

        loop {
            if hwnd.0.is_null() {
                return 0;
            }

            if IsWindowVisible(hwnd).as_bool() {
                let mut owner_pid = 0u32;
                GetWindowThreadProcessId(hwnd, Some(&mut owner_pid));
                let unowned = GetWindow(hwnd, GW_OWNER)
                    .map(|owner| owner.0.is_null())
                    .unwrap_or(true);
                if owner_pid == pid && unowned {
                    return hwnd.0 as isize;
                }
            }

            hwnd = match GetWindow(hwnd, GW_HWNDNEXT) {
                Ok(h) => h,
                Err(_) => return 0,
            };
        }
    }
}

pub(crate) fn window_title(hwnd: isize) -> String {
    unsafe {
        let mut title = vec![0u16; 512];
        let len = GetWindowTextW(HWND(hwnd as *mut _), &mut title);
        if len > 0 {
            String::from_utf16_lossy(&title[..len as usize])
        } else {
            String::new()
        }
    }
}

// Uses the AttachThreadInput trick to get past focus-stealing prevention.
pub(crate) fn bring_window_to_front(hwnd: isize) -> Result<bool, AutomationError> {
    if hwnd == 0 {
        return Err(AutomationError::Platform(
            "cannot activate a null window handle".to_string(),
        ));
    }

    unsafe {
        let target = HWND(hwnd as *mut _);
        let foreground_before = GetForegroundWindow();

        if IsIconic(target).as_bool() {
            let _ = ShowWindow(target, SW_RESTORE);
            tracing::debug!("bring_window_to_front: restored minimized window");
        }

        let current_thread_id = GetCurrentThreadId();
        let target_thread_id = GetWindowThreadProcessId(target, None);
        let foreground_thread_id = GetWindowThreadProcessId(foreground_before, None);

        let mut attached_to_foreground = false;
        let mut attached_to_target = false;

        if foreground_thread_id != 0
            && foreground_thread_id != current_thread_id
            && AttachThreadInput(current_thread_id, foreground_thread_id, true).as_bool()
        {
            attached_to_foreground = true;
        }

        if target_thread_id != 0
            && target_thread_id != current_thread_id
            && target_thread_id != foreground_thread_id
            && AttachThreadInput(current_thread_id, target_thread_id, true).as_bool()
        {
            attached_to_target = true;
        }

        let _ = BringWindowToTop(target);
        let _ = ShowWindow(target, SW_SHOW);
        let granted = SetForegroundWindow(target).as_bool();

        if attached_to_target {
            let _ = AttachThreadInput(current_thread_id, target_thread_id, false);
        }
        if attached_to_foreground {
            let _ = AttachThreadInput(current_thread_id, foreground_thread_id, false);
        }

        let is_now_foreground = GetForegroundWindow().0 == target.0;
        tracing::debug!(
            "bring_window_to_front: hwnd={:#x}, SetForegroundWindow={}, is_foreground={}",
            hwnd,
            granted,
            is_now_foreground
        );

        Ok(is_now_foreground)
    }
}

pub(crate) fn detach(command: &mut Command) {
    command.creation_flags(DETACHED_PROCESS.0 | CREATE_NEW_PROCESS_GROUP.0);
}
