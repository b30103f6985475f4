//! `python_file_creator`: write a Python source file under a fixed root.
//!
//! Paths given by the agent are relative to the tool's root directory;
//! absolute paths and `..` segments are rejected before anything touches the
//! filesystem. Content is written to a temporary sibling and renamed into
//! place, so readers see either the old file or the complete new one.
//! Concurrent writers to the same path: the last rename wins.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    result::ToolResult,
    tool::{ParamSpec, ParamType, ToolDescriptor},
};
use maestro_core::{
    invoke::parse_arguments,
    traits::{Tool, ToolContext},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PythonFileArgs {
    filename: String,
    content: String,
    #[serde(default)]
    directory: Option<String>,
}

pub struct PythonFileCreatorTool {
    descriptor: ToolDescriptor,
    root: PathBuf,
}

impl PythonFileCreatorTool {
    pub const NAME: &'static str = "python_file_creator";

    /// Files are created under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let descriptor = ToolDescriptor::new(Self::NAME, "Creates a Python file locally with the specified content")
            .param(
                "filename",
                ParamSpec::required(ParamType::String, "Name of the Python file to create (with .py extension)"),
            )
            .param("content", ParamSpec::required(ParamType::String, "Content to write in the Python file"))
            .param(
                "directory",
                ParamSpec::optional(
                    ParamType::String,
                    "Directory where to create the file (default: current directory)",
                )
                .nullable()
                .with_default(json!(".")),
            )
            .output(ParamType::String);

        Self {
            descriptor,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A relative path with no parent or root components.
fn confined(path: &str, what: &str) -> MaestroResult<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(MaestroError::validation(format!("{what} '{path}' must not contain '..'")));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(MaestroError::validation(format!("{what} '{path}' must be relative")));
            }
        }
    }
    Ok(clean)
}

fn file_name(filename: &str) -> MaestroResult<String> {
    let relative = confined(filename, "filename")?;
    let mut components = relative.components();
    let name = match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name.to_string_lossy().into_owned(),
        _ => {
            return Err(MaestroError::validation(format!(
                "filename '{filename}' must be a plain file name; use 'directory' for folders"
            )))
        }
    };
    Ok(if name.ends_with(".py") { name } else { format!("{name}.py") })
}

#[async_trait]
impl Tool for PythonFileCreatorTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: PythonFileArgs = parse_arguments(arguments)?;
        let name = file_name(&args.filename)?;
        let directory = confined(args.directory.as_deref().unwrap_or("."), "directory")?;

        let target_dir = self.root.join(&directory);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| MaestroError::execution(format!("cannot create '{}': {e}", target_dir.display())))?;

        let target = target_dir.join(&name);
        let staging = target_dir.join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&staging, args.content.as_bytes()).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(MaestroError::execution(format!("cannot write '{}': {e}", target.display())));
        }
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(MaestroError::execution(format!("cannot write '{}': {e}", target.display())));
        }

        let reported = directory.join(&name);
        debug!(run_id = %ctx.run_id, path = %reported.display(), bytes = args.content.len(), "python file written");

        Ok(ToolResult::ok(Value::String(format!(
            "Successfully created Python file at: {}",
            reported.display()
        ))))
    }
}
