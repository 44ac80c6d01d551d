use chrono::Local;
use std::env;

pub fn get_server_instructions() -> String {
    let current_date_time = Local::now().to_string();
    let current_os = env::consts::OS;

    format!(
        "
You control Notepad on a Windows desktop. Every tool acts on a real window, so keep calls sequential and let each one finish before the next.

**Targeting**
*   `open` returns `Opened (pid=N)`. Pass that `pid` to later calls when several Notepad windows may be open.
*   Without `pid`, tools act on the most recently started Notepad.
*   `list_windows` returns a JSON array of {{Id, MainWindowTitle}} for every Notepad with a window (empty array if none).

**Editing**
*   `paste_text` goes through the clipboard: any text, including newlines, quotes and Unicode, lands verbatim at the caret. It overwrites the user's clipboard.
*   `send_keys` takes SendKeys syntax: `^` Ctrl, `%` Alt, `+` Shift, braces for named keys (`{{ENTER}}`, `{{TAB}}`, `{{F5}}`). Use it for navigation and shortcuts, not for long text.

**Saving and closing**
*   `save_file` without `filePath` presses Ctrl+S. With `filePath`, it fills the Save As dialog and confirms. An existing file at that path may trigger an overwrite prompt that you must answer with `send_keys`.
*   `close` presses Alt+F4 and answers an unsaved-changes prompt with \"Don't save\" unless `dontSave` is false. The answer keys default to the English dialog and are set by the server operator.

**Errors**
*   \"Window not ready\" means no matching Notepad window appeared in time. Call `list_windows` or `open` and retry.
*   \"Script timed out\" means the automation script was killed; the window may be blocked by a modal dialog.

Contextual information:
- The current date and time is {current_date_time}.
- Current operating system: {current_os}.
"
    )
}
