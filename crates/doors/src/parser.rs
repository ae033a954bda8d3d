//! Parsing of the Markdown-like export written by the testcase script.
//!
//! Each record looks like:
//!
//! ```text
//! ++++++++++++++++++++++++++++++++++++++++++++++++++++++
//! ## Testcase: TC-12
//! - **URL**: doors://server:36677/?version=2&prodID=0&urn=...
//! - **Status**: Released
//! - **Description**: Login with a valid account
//! - **Steps**:
//! 1. Open the login page
//! 2. Submit credentials
//! - **Expected Results**:
//! The dashboard is shown
//! ```

use crate::dxl::{DXL_SUCCESS_MARKER, RECORD_DELIMITER};
use crate::errors::{DoorsError, Result};
use crate::testcase::{Testcase, OBJECT_STATUS_RELEASED, OBJECT_TYPE_TESTCASE};
use std::path::Path;
use tracing::{debug, error, info};

const ID_PREFIX: &str = "## Testcase:";
const URL_PREFIX: &str = "- **URL**:";
const STATUS_PREFIX: &str = "- **Status**:";
const DESCRIPTION_PREFIX: &str = "- **Description**:";
const STEPS_PREFIX: &str = "- **Steps**:";
const EXPECTED_PREFIX: &str = "- **Expected Results**:";

/// Fails when the export is missing or empty.
pub async fn check_artifact(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(meta) if meta.is_file() => {
            error!("File is empty: {}", path.display());
            Err(DoorsError::OutputEmpty(path.to_path_buf()))
        }
        _ => {
            error!("File does not exist: {}", path.display());
            Err(DoorsError::OutputMissing(path.to_path_buf()))
        }
    }
}

/// Drops every line made only of spaces, tabs and carriage returns.
pub fn strip_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| line.chars().any(|c| !matches!(c, ' ' | '\t' | '\r')))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads the export, removes blank lines and writes the cleaned text back.
/// An export that is not valid UTF-8 is rejected and left as it is on disk.
pub async fn normalize_artifact(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DoorsError::io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        error!("Output is not valid UTF-8: {}", path.display());
        DoorsError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    let cleaned = strip_blank_lines(&text);
    tokio::fs::write(path, &cleaned)
        .await
        .map_err(|e| DoorsError::io(path, e))?;
    Ok(cleaned)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Description,
    Steps,
    Expected,
}

#[derive(Debug, Default)]
struct PartialTestcase {
    id: Option<String>,
    url: Option<String>,
    status: Option<String>,
    description: Option<Vec<String>>,
    steps: Option<Vec<String>>,
    expected: Option<Vec<String>>,
}

impl PartialTestcase {
    fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.url.is_none()
            && self.status.is_none()
            && self.description.is_none()
            && self.steps.is_none()
            && self.expected.is_none()
    }

    fn section_mut(&mut self, section: Section) -> Option<&mut Vec<String>> {
        match section {
            Section::Header => None,
            Section::Description => self.description.as_mut(),
            Section::Steps => self.steps.as_mut(),
            Section::Expected => self.expected.as_mut(),
        }
    }

    fn finish(self) -> Option<Testcase> {
        let join = |lines: Vec<String>| lines.join("\n").trim().to_string();
        let id = self.id?;
        let Some(tc_url) = self.url else {
            debug!("Skipping testcase {id}: no URL line");
            return None;
        };
        let (Some(description), Some(steps), Some(expected)) =
            (self.description, self.steps, self.expected)
        else {
            debug!("Skipping testcase {id}: description, steps or expected results missing");
            return None;
        };

        Some(Testcase {
            id,
            object_type: OBJECT_TYPE_TESTCASE.to_string(),
            object_status: self
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| OBJECT_STATUS_RELEASED.to_string()),
            tc_url,
            test_description: join(description),
            test_steps: join(steps),
            expected_results: join(expected),
        })
    }
}

fn inline_value(line: &str, prefix: &str) -> String {
    line[prefix.len()..].trim().to_string()
}

fn opened_section(line: &str, prefix: &str) -> Vec<String> {
    let first = inline_value(line, prefix);
    if first.is_empty() {
        Vec::new()
    } else {
        vec![first]
    }
}

/// Parses the export into testcases. Blocks that lack an ID, URL,
/// description, steps or expected results are skipped.
pub fn parse_testcases(text: &str) -> Vec<Testcase> {
    let mut testcases = Vec::new();
    let mut current = PartialTestcase::default();
    let mut section = Section::Header;
    let mut skipped = 0usize;

    let mut flush = |block: PartialTestcase, testcases: &mut Vec<Testcase>| {
        if block.is_empty() {
            return;
        }
        match block.finish() {
            Some(tc) => testcases.push(tc),
            None => skipped += 1,
        }
    };

    for raw in text.lines() {
        let mut line = raw.trim_end();
        if let Some(before) = line.strip_suffix(DXL_SUCCESS_MARKER) {
            line = before.trim_end();
        }
        if line.trim().is_empty() {
            continue;
        }

        if line.trim() == RECORD_DELIMITER {
            flush(std::mem::take(&mut current), &mut testcases);
            section = Section::Header;
            continue;
        }

        if line.starts_with(ID_PREFIX) {
            if current.id.is_some() {
                flush(std::mem::take(&mut current), &mut testcases);
            }
            current.id = Some(inline_value(line, ID_PREFIX));
            section = Section::Header;
        } else if line.starts_with(URL_PREFIX) {
            current.url = Some(inline_value(line, URL_PREFIX));
            section = Section::Header;
        } else if line.starts_with(STATUS_PREFIX) {
            current.status = Some(inline_value(line, STATUS_PREFIX));
            section = Section::Header;
        } else if line.starts_with(DESCRIPTION_PREFIX) {
            current.description = Some(opened_section(line, DESCRIPTION_PREFIX));
            section = Section::Description;
        } else if line.starts_with(STEPS_PREFIX) {
            current.steps = Some(opened_section(line, STEPS_PREFIX));
            section = Section::Steps;
        } else if line.starts_with(EXPECTED_PREFIX) {
            current.expected = Some(opened_section(line, EXPECTED_PREFIX));
            section = Section::Expected;
        } else if let Some(lines) = current.section_mut(section) {
            lines.push(line.trim().to_string());
        } else {
            debug!("Ignoring line outside any section: {line}");
        }
    }
    flush(current, &mut testcases);

    if skipped > 0 {
        info!("Skipped {skipped} incomplete testcase block(s)");
    }
    testcases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_blank_lines_keeps_content_lines() {
        let text = "a\n\n \t\r\nb\r\n   \nc";
        assert_eq!(strip_blank_lines(text), "a\nb\nc");
    }

    #[test]
    fn inline_steps_text_is_kept() {
        let text = "## Testcase: TC-9\n- **URL**: u\n- **Description**: d\n- **Steps**: only step\n- **Expected Results**: ok";
        let parsed = parse_testcases(text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].test_steps, "only step");
        assert_eq!(parsed[0].expected_results, "ok");
    }

    #[test]
    fn marker_glued_to_last_line_is_stripped() {
        let text = "## Testcase: TC-9\n- **URL**: u\n- **Description**: d\n- **Steps**:\ns\n- **Expected Results**:\nr__DXL_SUCCESS__";
        let parsed = parse_testcases(text);
        assert_eq!(parsed[0].expected_results, "r");
    }

    #[test]
    fn lines_before_any_section_are_ignored() {
        let text = "stray text\n## Testcase: TC-1\nmore stray\n- **URL**: u\n- **Description**: d\n- **Steps**:\ns\n- **Expected Results**:\nr";
        let parsed = parse_testcases(text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].test_description, "d");
    }
}
