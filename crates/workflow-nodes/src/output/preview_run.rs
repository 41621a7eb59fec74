//! Run Preview Node

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};

use crate::services::WorkspaceService;
use crate::values::{config_number, input_as, output, require, unless_cancelled, WorkspaceRef};

/// Starts the workspace dev server and reports where it listens
///
/// # Inputs
/// - `workspace` (required) - `{path, heroId}`
///
/// # Config
/// - `startPort` - First port to try, never below 3010
///
/// # Outputs
/// - `preview` - `{url, port, pid}`
pub struct PreviewRunNode {
    workspace: Arc<dyn WorkspaceService>,
}

impl PreviewRunNode {
    pub const NODE_TYPE: &'static str = "preview.run";
    pub const PORT_WORKSPACE: &'static str = "workspace";
    pub const PORT_PREVIEW: &'static str = "preview";
    pub const MIN_START_PORT: u16 = 3010;

    pub fn new(workspace: Arc<dyn WorkspaceService>) -> Self {
        Self { workspace }
    }

    fn start_port(requested: Option<f64>) -> u16 {
        requested
            .map(|port| port.clamp(f64::from(Self::MIN_START_PORT), f64::from(u16::MAX)) as u16)
            .unwrap_or(Self::MIN_START_PORT)
    }
}

impl TaskDescriptor for PreviewRunNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Output, "Run Preview")
            .with_description("Start local dev server and return preview URL")
            .with_input(PortMetadata::required(
                Self::PORT_WORKSPACE,
                "workspace",
                PortDataType::Workspace,
            ))
            .with_output(PortMetadata::required(
                Self::PORT_PREVIEW,
                "preview",
                PortDataType::Preview,
            ))
            .with_default_ports(Some(Self::PORT_WORKSPACE), Some(Self::PORT_PREVIEW))
    }
}

#[async_trait]
impl NodeExecutor for PreviewRunNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let workspace = require(
            input_as::<WorkspaceRef>(&request.inputs, Self::PORT_WORKSPACE)
                .filter(|w| !w.path.is_empty() && !w.hero_id.is_empty()),
            "preview.run requires workspace input",
        )?;
        let start_port = Self::start_port(config_number(request.config, "startPort"));

        let preview = unless_cancelled(
            request.ctx,
            self.workspace
                .run_preview(&workspace.path, &workspace.hero_id, start_port, request.log),
        )
        .await?;

        request.log.log(format!("Preview URL {}", preview.url));
        output(Self::PORT_PREVIEW, preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cancel_soon, execute, execute_in, FakeWorkspace, Stalled};
    use crate::values::CANCELLED_MESSAGE;
    use node_engine::RunContext;
    use std::time::Duration;
    use serde_json::json;

    #[test]
    fn test_start_port_clamp() {
        assert_eq!(PreviewRunNode::start_port(None), 3010);
        assert_eq!(PreviewRunNode::start_port(Some(80.0)), 3010);
        assert_eq!(PreviewRunNode::start_port(Some(4000.0)), 4000);
        assert_eq!(PreviewRunNode::start_port(Some(1e9)), u16::MAX);
    }

    #[tokio::test]
    async fn test_preview() {
        let fake = Arc::new(FakeWorkspace::default());
        let node = PreviewRunNode::new(fake.clone());

        let outcome = execute(
            &node,
            json!({"startPort": "1200"}),
            json!({"workspace": {"path": "/data/workspaces/r", "heroId": "hero_a"}}),
        )
        .await;
        assert_eq!(
            outcome.output()["preview"],
            json!({"url": "http://localhost:3010/preview/hero_a", "port": 3010, "pid": 4242})
        );
        assert!(outcome.logged("Preview URL http://localhost:3010/preview/hero_a"));
        assert_eq!(fake.calls.lock()[0], "preview /data/workspaces/r hero_a 3010");
    }

    #[tokio::test]
    async fn test_missing_workspace() {
        let node = PreviewRunNode::new(Arc::new(FakeWorkspace::default()));
        let outcome = execute(&node, json!({}), json!({"workspace": {"path": "/x"}})).await;
        assert_eq!(outcome.error(), "preview.run requires workspace input");
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_preview_start() {
        let node = PreviewRunNode::new(Arc::new(Stalled));
        let inputs = json!({"workspace": {"path": "/data/workspaces/r", "heroId": "hero_a"}});

        let ctx = RunContext::new(None);
        cancel_soon(&ctx);
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            execute_in(&node, &ctx, json!({}), inputs.clone()),
        )
        .await
        .expect("preview start ignored cancellation");
        assert_eq!(outcome.error(), CANCELLED_MESSAGE);

        let fake = Arc::new(FakeWorkspace::default());
        let node = PreviewRunNode::new(fake.clone());
        let outcome = execute_in(&node, &ctx, json!({}), inputs).await;
        assert_eq!(outcome.error(), CANCELLED_MESSAGE);
        assert!(fake.calls.lock().is_empty());
    }
}
