//! DXL script generation for the testcase export.

use crate::errors::{DoorsError, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Written last by the script; its presence means the export is complete.
pub const DXL_SUCCESS_MARKER: &str = "__DXL_SUCCESS__";
/// Written instead of any records when the script cannot open the module.
pub const DXL_ERROR_MARKER: &str = "__DXL_ERROR__";
/// Separates testcase blocks in the export.
pub const RECORD_DELIMITER: &str = "++++++++++++++++++++++++++++++++++++++++++++++++++++++";

pub const OUTPUT_FILE_NAME: &str = "output.md";
pub const SCRIPT_FILE_NAME: &str = "script.dxl";

/// Joins `output.md` onto the output directory with forward slashes, which
/// DXL accepts on Windows and which need no escaping inside string literals.
pub fn normalize_output_path(output_dir: &Path) -> String {
    output_dir
        .join(OUTPUT_FILE_NAME)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Escapes a value for use inside a DXL double-quoted string literal.
pub fn escape_dxl_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Builds the script that writes every released testcase of `module_path`
/// to `out_path` and finishes with [`DXL_SUCCESS_MARKER`].
pub fn testcase_export_script(module_path: &str, out_path: &str) -> String {
    let module = escape_dxl_string(module_path);
    let out = escape_dxl_string(out_path);

    format!(
        r###"Module m = null
Object o = null

Stream output = write("{out}")
m = read("{module}", false)
if (null m) {{
    output << "{error_marker}: module {module} not found\n"
    close(output)
    print "ERROR: {module} not found\n"
    halt
}}

for o in m do {{
    string objType = o."Object_Type"
    string objStatus = o."Object_Status"
    if (!null objType && objType == "Testcase" && !null objStatus && objStatus == "Released")
    {{
        output << "{delimiter}\n"
        output << "## Testcase: " identifier(o) "\n"
        output << "- **URL**: " getURL(o) "\n"
        output << "- **Status**: Released\n"
        output << "- **Description**: " o."Test_Description" "\n"
        output << "- **Steps**:\n" o."Test_Steps" "\n"
        output << "- **Expected Results**:\n" o."Expected_Results" "\n"
    }}
}}
output << "{success_marker}"
close(output)
close(m)
"###,
        delimiter = RECORD_DELIMITER,
        error_marker = DXL_ERROR_MARKER,
        success_marker = DXL_SUCCESS_MARKER,
    )
}

/// Writes `body` to `script.dxl` inside `dir` and checks the file landed.
pub async fn write_script(dir: &Path, body: &str) -> Result<PathBuf> {
    let script_path = dir.join(SCRIPT_FILE_NAME);
    tokio::fs::write(&script_path, body)
        .await
        .map_err(|e| DoorsError::io(&script_path, e))?;

    match tokio::fs::metadata(&script_path).await {
        Ok(meta) if meta.len() > 0 => {
            info!("script.dxl generated, path: {}", script_path.display());
            Ok(script_path)
        }
        Ok(_) => {
            error!("script.dxl file is empty, path: {}", script_path.display());
            Err(DoorsError::Script(format!(
                "script.dxl file is empty, path: {}",
                script_path.display()
            )))
        }
        Err(_) => {
            error!("script.dxl not generated, path: {}", script_path.display());
            Err(DoorsError::Script(format!(
                "script.dxl not generated, path: {}",
                script_path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_uses_forward_slashes() {
        let path = normalize_output_path(Path::new(r"C:\exports\run1"));
        assert_eq!(path, "C:/exports/run1/output.md");
    }

    #[test]
    fn script_targets_module_and_output() {
        let script = testcase_export_script("/Project/System/Tests", "C:/out/output.md");
        assert!(script.contains(r#"m = read("/Project/System/Tests", false)"#));
        assert!(script.contains(r#"Stream output = write("C:/out/output.md")"#));
        assert!(script.contains(RECORD_DELIMITER));
        assert!(script.trim_end().ends_with("close(m)"));
        // Success marker is the last thing streamed to the file.
        let marker_at = script.find(DXL_SUCCESS_MARKER).unwrap();
        let close_at = script.rfind("close(output)").unwrap();
        assert!(marker_at < close_at);
    }

    #[test]
    fn script_writes_every_record_heading() {
        let script = testcase_export_script("/P/M", "/tmp/output.md");
        for line in [
            r###"output << "## Testcase: " identifier(o) "\n""###,
            r#"output << "- **URL**: " getURL(o) "\n""#,
            r#"output << "- **Expected Results**:\n" o."Expected_Results" "\n""#,
        ] {
            assert!(script.contains(line), "missing {line}");
        }
    }

    #[test]
    fn script_escapes_quotes_in_module_path() {
        let script = testcase_export_script(r#"/Odd "name"\mod"#, "/tmp/output.md");
        assert!(script.contains(r#"read("/Odd \"name\"\\mod", false)"#));
    }

    #[tokio::test]
    async fn write_script_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "print \"hi\"\n").await.unwrap();
        assert_eq!(path.file_name().unwrap(), SCRIPT_FILE_NAME);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print \"hi\"\n");
    }

    #[tokio::test]
    async fn write_script_rejects_empty_body() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_script(dir.path(), "").await.unwrap_err();
        assert!(matches!(err, DoorsError::Script(_)));
    }
}
