use crate::client::DoorsClient;
use crate::config::DoorsConfig;
use crate::dxl::{self, normalize_output_path, testcase_export_script};
use crate::errors::{DoorsError, Result};
use crate::parser::{check_artifact, normalize_artifact, parse_testcases};
use crate::testcase::Testcase;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// A validated testcase export request together with its generated script.
#[derive(Debug, Clone)]
pub struct TestcaseExport {
    pub module_path: String,
    pub output_dir: PathBuf,
    /// `output.md` inside `output_dir`, with forward slashes
    pub output_file: String,
    pub script: String,
}

impl TestcaseExport {
    pub fn prepare(module_path: &str, output_dir: &Path) -> Result<Self> {
        let module_path = module_path.trim();
        if module_path.is_empty() {
            return Err(DoorsError::InvalidArgument(
                "Module path is required, e.g. /Project/System/TestcaseModule".to_string(),
            ));
        }
        if !output_dir.is_dir() {
            return Err(DoorsError::InvalidOutputDir(output_dir.to_path_buf()));
        }

        let output_file = normalize_output_path(output_dir);
        let script = testcase_export_script(module_path, &output_file);
        Ok(Self {
            module_path: module_path.to_string(),
            output_dir: output_dir.to_path_buf(),
            output_file,
            script,
        })
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_file)
    }
}

/// Exports the released testcases of `module_path` through the DOORS client
/// and returns them parsed. `output_dir` keeps the cleaned `output.md`.
#[instrument(skip(config), fields(server = %config.server_addr))]
pub async fn get_testcases(
    config: &DoorsConfig,
    module_path: &str,
    output_dir: &Path,
) -> Result<Vec<Testcase>> {
    let export = TestcaseExport::prepare(module_path, output_dir)?;
    info!("Using output path: {}", export.output_file);

    // The scratch directory holding script.dxl is removed when this drops.
    let scratch = tempfile::Builder::new()
        .prefix("doors-dxl")
        .tempdir()
        .map_err(|e| DoorsError::io(std::env::temp_dir(), e))?;
    let script_path = dxl::write_script(scratch.path(), &export.script).await?;

    let client = DoorsClient::new(config.clone());
    let out_path = export.output_path();
    client.run_script(&script_path, &out_path).await?;

    check_artifact(&out_path).await?;
    let cleaned = normalize_artifact(&out_path).await?;
    let testcases = parse_testcases(&cleaned);
    info!(
        "Parsed {} testcase(s) from {}",
        testcases.len(),
        export.output_file
    );
    Ok(testcases)
}
