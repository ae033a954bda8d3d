use chrono::Local;
use std::env;

pub fn get_server_instructions() -> String {
    let current_date_time = Local::now().to_string();
    let current_os = env::consts::OS;
    let current_working_dir = env::current_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "Unknown".to_string());

    format!(
        "
This server reads testcase objects out of IBM DOORS by running DXL scripts in the DOORS desktop client.

**Tools**
*   `get_testcases` exports every object of a module whose `Object_Type` is `Testcase` and whose `Object_Status` is `Released`. It needs the full module path (e.g. `/Project/System/SysT/SysTS`) and an existing directory for `output.md`.
*   `generate_testcase_script` returns the DXL the export would run, without starting DOORS. Use it to check module and output paths.

**Behavior**
*   Each `get_testcases` call launches the DOORS client, waits until the script writes its completion marker (up to `DOORS_MAX_WAIT` seconds, default 1200), then closes the client. Large modules take minutes; do not call it in parallel.
*   Credentials come from the server environment: `DOORS_USERNAME`, `DOORS_PASSWORD`, `DOORS_SERVERADDR`, optional `DOORS_PATH`.
*   A timeout usually means the login failed or a DOORS dialog is waiting for input on the desktop.

Contextual information:
- The current date and time is {current_date_time}.
- Current operating system: {current_os}.
- Current working directory: {current_working_dir}.
"
    )
}
