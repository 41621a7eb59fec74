//! Apply Workspace Node

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};

use crate::services::{ApplyOptions, WorkspaceService};
use crate::values::{config_bool, input_as, output, require, unless_cancelled, PatchPlan};

/// Materializes a patch plan into the run's workspace
///
/// # Inputs
/// - `patchPlan` (required) - Must carry `heroId`, `workspaceName` and `ops`
///
/// # Config
/// - `keepExisting` - Reuse the previous workspace contents (default `false`)
///
/// # Outputs
/// - `workspace` - `{path, heroId}`
pub struct WorkspaceApplyNode {
    workspace: Arc<dyn WorkspaceService>,
}

impl WorkspaceApplyNode {
    pub const NODE_TYPE: &'static str = "workspace.apply";
    pub const PORT_PATCH_PLAN: &'static str = "patchPlan";
    pub const PORT_WORKSPACE: &'static str = "workspace";

    pub fn new(workspace: Arc<dyn WorkspaceService>) -> Self {
        Self { workspace }
    }
}

impl TaskDescriptor for WorkspaceApplyNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Output, "Apply Workspace")
            .with_description("Create workspace and apply patch operations")
            .with_input(PortMetadata::required(
                Self::PORT_PATCH_PLAN,
                "patchPlan",
                PortDataType::PatchPlan,
            ))
            .with_output(PortMetadata::required(
                Self::PORT_WORKSPACE,
                "workspace",
                PortDataType::Workspace,
            ))
            .with_default_ports(Some(Self::PORT_PATCH_PLAN), Some(Self::PORT_WORKSPACE))
    }
}

#[async_trait]
impl NodeExecutor for WorkspaceApplyNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let plan = require(
            input_as::<PatchPlan>(&request.inputs, Self::PORT_PATCH_PLAN)
                .filter(|p| !p.hero_id.trim().is_empty() && !p.workspace_name.trim().is_empty()),
            "workspace.apply requires patchPlan input",
        )?;
        let options = ApplyOptions {
            keep_existing: config_bool(request.config, "keepExisting", false),
        };

        let workspace = unless_cancelled(
            request.ctx,
            self.workspace
                .apply_patch_plan(&request.ctx.run_id, &plan, options, request.log),
        )
        .await?;

        request
            .log
            .log(format!("Workspace ready at {}", workspace.path));
        output(Self::PORT_WORKSPACE, workspace)
    }
}
