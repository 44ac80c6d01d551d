//! Driving Notepad from the outside.
//!
//! The crate finds (or launches) the editor, waits for its window to exist,
//! brings it to the foreground and then feeds it clipboard content and
//! keystrokes through short PowerShell scripts. Windows is the only target
//! with a real window back-end.

pub mod config;
pub mod errors;
pub mod escape;
pub mod focus;
pub mod interpreter;
mod platforms;
pub mod process;
pub mod script;
pub mod sequencer;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod window;

pub use config::AutomationConfig;
pub use errors::AutomationError;
pub use escape::{decode_literal, double_single_quotes, escape_for_literal};
pub use focus::{FocusController, FocusedWindow};
pub use interpreter::{PowerShell, ScriptRunner, POWERSHELL_ARGS};
pub use process::{ManagedProcess, ProcessHost, SystemProcessHost, WindowHandle, WindowSummary};
pub use script::{AutomationScript, ScriptStep};
pub use sequencer::{SaveOutcome, Sequencer};
pub use window::{await_main_window, resolve_target, WindowReadiness};
