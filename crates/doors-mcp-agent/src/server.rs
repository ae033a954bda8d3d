pub use crate::utils::DoorsWrapper;
use crate::utils::{GenerateScriptArgs, GetTestcasesArgs};
use doors::dxl::normalize_output_path;
use doors::{DoorsConfig, DoorsError, TestcaseExport};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult,
    PaginatedRequestParam, ProtocolVersion, RawResource, ReadResourceRequestParam,
    ReadResourceResult, Resource, ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, ErrorData as McpError, ServerHandler};
use rmcp::{tool_handler, tool_router};
use serde_json::json;
use std::path::Path;
use tracing::{error, info};

pub const VERSION_RESOURCE_URI: &str = "config://version";

fn suggestions_for(err: &DoorsError) -> Vec<&'static str> {
    match err {
        DoorsError::MissingCredentials(_) => vec![
            "Set DOORS_USERNAME, DOORS_PASSWORD and DOORS_SERVERADDR in the server environment or its .env file.",
        ],
        DoorsError::InvalidConfig(_) => vec![
            "DOORS_MAX_WAIT is in whole seconds and DOORS_POLL_INTERVAL_MS in whole milliseconds.",
        ],
        DoorsError::InvalidArgument(_) => {
            vec!["Pass the full module path, e.g. /Project/System/SysT/SysTS."]
        }
        DoorsError::InvalidOutputDir(_) => vec![
            "Create the output directory first; the bridge only writes output.md into an existing directory.",
        ],
        DoorsError::Launch { .. } => vec![
            "Check DOORS_PATH points at doors.exe on this machine.",
        ],
        DoorsError::Timeout { .. } => vec![
            "Check the DOORS credentials and server address; a failed login leaves a dialog open and the script never runs.",
            "Raise DOORS_MAX_WAIT for very large modules.",
        ],
        DoorsError::ClientReported { .. } => vec![
            "Verify the module path exists and the account can read it.",
        ],
        DoorsError::OutputMissing(_) | DoorsError::OutputEmpty(_) => vec![
            "Make sure the DOORS client can write to the output directory.",
        ],
        DoorsError::Script(_) | DoorsError::Io { .. } => {
            vec!["Check disk space and permissions on the temp and output directories."]
        }
    }
}

/// Builds an MCP error carrying the failed call's context. Problems the
/// caller can fix become `invalid_params`; everything else is internal.
pub fn doors_error_to_mcp(err: &DoorsError, module_path: &str, output_path: &str) -> McpError {
    let payload = json!({
        "error_type": err.kind(),
        "message": err.to_string(),
        "module_path": module_path,
        "output_path": output_path,
        "command": err.command(),
        "suggestions": suggestions_for(err),
    });

    if err.is_caller_error() {
        McpError::invalid_params(err.to_string(), Some(payload))
    } else {
        McpError::internal_error(err.to_string(), Some(payload))
    }
}

fn version_resource() -> Resource {
    let mut raw = RawResource::new(VERSION_RESOURCE_URI, "version".to_string());
    raw.description = Some("Version of the DOORS MCP bridge".to_string());
    raw.mime_type = Some("text/plain".to_string());
    raw.no_annotation()
}

pub fn read_resource_contents(uri: &str) -> Result<ReadResourceResult, McpError> {
    match uri {
        VERSION_RESOURCE_URI => Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(env!("CARGO_PKG_VERSION"), uri)],
        }),
        _ => Err(McpError::resource_not_found(
            "Resource not found",
            Some(json!({ "uri": uri })),
        )),
    }
}

#[tool_router]
impl DoorsWrapper {
    /// Reads DOORS settings from the environment on each call.
    pub fn new() -> Self {
        Self {
            config: None,
            tool_router: Self::tool_router(),
        }
    }

    pub fn with_config(config: DoorsConfig) -> Self {
        Self {
            config: Some(config),
            tool_router: Self::tool_router(),
        }
    }

    fn resolve_config(&self) -> Result<DoorsConfig, DoorsError> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => DoorsConfig::from_env(),
        }
    }

    #[tool(
        description = "Query testcase objects from a DOORS module. Runs a DXL script in the DOORS client, waits for it to finish, and returns every Released Testcase object with ID, Object_Type, Object_Status, TcURL, Test_Description, Test_Steps and Expected_Results. The raw export is kept as output.md in output_path."
    )]
    pub async fn get_testcases(
        &self,
        Parameters(args): Parameters<GetTestcasesArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "get_testcases: module_path={}, output_path={}",
            args.module_path, args.output_path
        );
        let to_mcp = |e: DoorsError| {
            error!("get_testcases failed: {e}");
            doors_error_to_mcp(&e, &args.module_path, &args.output_path)
        };

        let config = self.resolve_config().map_err(to_mcp)?;
        let output_dir = Path::new(&args.output_path);
        let testcases = doors::get_testcases(&config, &args.module_path, output_dir)
            .await
            .map_err(to_mcp)?;

        let result_json = json!({
            "action": "get_testcases",
            "status": "success",
            "module_path": args.module_path,
            "output_file": normalize_output_path(output_dir),
            "count": testcases.len(),
            "testcases": testcases,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        Ok(CallToolResult::success(vec![Content::json(result_json)?]))
    }

    #[tool(
        description = "Return the DXL script get_testcases would run for a module and output directory, without starting DOORS. This is a read-only operation."
    )]
    pub async fn generate_testcase_script(
        &self,
        Parameters(args): Parameters<GenerateScriptArgs>,
    ) -> Result<CallToolResult, McpError> {
        let export = TestcaseExport::prepare(&args.module_path, Path::new(&args.output_path))
            .map_err(|e| doors_error_to_mcp(&e, &args.module_path, &args.output_path))?;

        let result_json = json!({
            "action": "generate_testcase_script",
            "status": "success",
            "module_path": export.module_path,
            "output_file": export.output_file,
            "script": export.script,
        });

        Ok(CallToolResult::success(vec![Content::json(result_json)?]))
    }
}

impl Default for DoorsWrapper {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for DoorsWrapper {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(crate::prompt::get_server_instructions()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![version_resource()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        read_resource_contents(&uri)
    }
}
