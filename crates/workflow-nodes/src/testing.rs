//! Shared fixtures for node unit tests

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{NodeExecutor, NodeLogger, NodeRequest, PortValues, RunContext};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{Result, ServiceError};
use crate::services::{
    ApplyOptions, HeroCatalog, HeroRecord, NewHeroRecord, Thumbnail, VisionPromptService,
    WorkspaceService,
};
use crate::setup::Services;
use crate::values::{PatchPlan, PreviewRef, WorkspaceRef};

pub struct Outcome {
    pub result: node_engine::Result<PortValues>,
    pub logs: Vec<String>,
}

impl Outcome {
    pub fn output(&self) -> &PortValues {
        self.result.as_ref().unwrap()
    }

    pub fn error(&self) -> String {
        self.result.as_ref().unwrap_err().to_string()
    }

    pub fn logged(&self, suffix: &str) -> bool {
        self.logs.iter().any(|line| line.ends_with(suffix))
    }
}

pub async fn execute(executor: &dyn NodeExecutor, config: Value, inputs: Value) -> Outcome {
    execute_in(executor, &RunContext::new(None), config, inputs).await
}

pub async fn execute_in(
    executor: &dyn NodeExecutor,
    ctx: &RunContext,
    config: Value,
    inputs: Value,
) -> Outcome {
    let config = config.as_object().cloned().unwrap_or_default();
    let inputs = inputs.as_object().cloned().unwrap_or_default();
    let log = NodeLogger::new("node-1");
    let result = executor
        .execute(NodeRequest {
            node_id: "node-1",
            config: &config,
            inputs,
            ctx,
            log: &log,
        })
        .await;
    Outcome {
        result,
        logs: log.lines(),
    }
}

/// Records calls and answers with fixed values
#[derive(Default)]
pub struct FakeWorkspace {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl WorkspaceService for FakeWorkspace {
    async fn apply_patch_plan(
        &self,
        run_id: &str,
        plan: &PatchPlan,
        options: ApplyOptions,
        log: &NodeLogger,
    ) -> Result<WorkspaceRef> {
        log.log(format!("write {} ops", plan.ops.len()));
        self.calls.lock().push(format!(
            "apply {} {} keep={}",
            run_id, plan.hero_id, options.keep_existing
        ));
        Ok(WorkspaceRef {
            path: format!("/data/workspaces/{}", run_id),
            hero_id: plan.hero_id.clone(),
        })
    }

    async fn run_preview(
        &self,
        workspace_path: &str,
        hero_id: &str,
        start_port: u16,
        _log: &NodeLogger,
    ) -> Result<PreviewRef> {
        self.calls
            .lock()
            .push(format!("preview {} {} {}", workspace_path, hero_id, start_port));
        Ok(PreviewRef {
            url: format!("http://localhost:{}/preview/{}", start_port, hero_id),
            port: start_port,
            pid: 4242,
        })
    }

    async fn stop_preview(&self, workspace_path: &str) -> Result<bool> {
        self.calls.lock().push(format!("stop {}", workspace_path));
        Ok(false)
    }

    async fn create_placeholder_thumbnail(&self, hero_id: &str, title: &str) -> Result<Thumbnail> {
        self.calls.lock().push(format!("thumbnail {} {}", hero_id, title));
        Ok(Thumbnail {
            absolute_path: format!("/data/thumbnails/{}.svg", hero_id).into(),
            relative_path: format!("data/thumbnails/{}.svg", hero_id),
        })
    }
}

/// Returns a canned prompt, or fails when `prompt` is `None`
pub struct FakeVision {
    pub prompt: Option<&'static str>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeVision {
    pub fn answering(prompt: &'static str) -> Self {
        Self {
            prompt: Some(prompt),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VisionPromptService for FakeVision {
    async fn extract_prompt(&self, image: &str, model: &str) -> Result<Value> {
        self.calls.lock().push((image.to_string(), model.to_string()));
        match self.prompt {
            Some(prompt) => Ok(json!({ "prompt": prompt, "style": "comic" })),
            None => Err(ServiceError::MissingCredential("OPENROUTER_API_KEY".to_string())),
        }
    }
}

/// Never answers; stands in for a hung install, dev server or vision call
pub struct Stalled;

#[async_trait]
impl WorkspaceService for Stalled {
    async fn apply_patch_plan(
        &self,
        _run_id: &str,
        _plan: &PatchPlan,
        _options: ApplyOptions,
        _log: &NodeLogger,
    ) -> Result<WorkspaceRef> {
        std::future::pending().await
    }

    async fn run_preview(
        &self,
        _workspace_path: &str,
        _hero_id: &str,
        _start_port: u16,
        _log: &NodeLogger,
    ) -> Result<PreviewRef> {
        std::future::pending().await
    }

    async fn stop_preview(&self, _workspace_path: &str) -> Result<bool> {
        Ok(false)
    }

    async fn create_placeholder_thumbnail(&self, hero_id: &str, _title: &str) -> Result<Thumbnail> {
        Ok(Thumbnail {
            absolute_path: format!("/data/thumbnails/{}.svg", hero_id).into(),
            relative_path: format!("data/thumbnails/{}.svg", hero_id),
        })
    }
}

#[async_trait]
impl VisionPromptService for Stalled {
    async fn extract_prompt(&self, _image: &str, _model: &str) -> Result<Value> {
        std::future::pending().await
    }
}

/// Cancels `ctx` after a short delay
pub fn cancel_soon(ctx: &RunContext) {
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
    });
}

#[derive(Default)]
pub struct MemoryCatalog {
    pub records: Mutex<Vec<HeroRecord>>,
}

#[async_trait]
impl HeroCatalog for MemoryCatalog {
    async fn publish(&self, record: NewHeroRecord) -> Result<HeroRecord> {
        let mut records = self.records.lock();
        let created = HeroRecord {
            id: format!("rec-{}", records.len() + 1),
            title: record.title,
            hero_id: record.hero_id,
            workspace_path: record.workspace_path,
            preview_url: record.preview_url,
            thumbnail_path: record.thumbnail_path,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        records.insert(0, created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<HeroRecord>> {
        Ok(self.records.lock().clone())
    }
}

pub fn fake_services() -> Services {
    Services {
        workspace: Arc::new(FakeWorkspace::default()),
        vision: Arc::new(FakeVision::answering("A caped hero over a neon city")),
        catalog: Arc::new(MemoryCatalog::default()),
    }
}
