//! Workspace materialization and hero file access
//!
//! Every path written on behalf of a patch plan is confined to
//! `src/heroes/<heroId>/` inside the run's workspace.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use node_engine::{format_timestamp, NodeLogger};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::fs;

use super::preview::{self, PreviewInfo, PreviewProcess, PreviewRegistry};
use crate::config::ServicesConfig;
use crate::error::{Result, ServiceError};
use crate::values::{FileOp, PatchPlan, PreviewRef, WorkspaceRef};

/// Marker describing how a workspace was produced
pub const WORKSPACE_MARKER: &str = ".superhero-workspace.json";

/// Options for [`WorkspaceService::apply_patch_plan`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Keep files from an earlier apply instead of starting from a clean copy
    pub keep_existing: bool,
}

/// A generated placeholder image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub absolute_path: PathBuf,
    /// Relative to the process working directory when possible
    pub relative_path: String,
}

/// Workspace operations the output nodes depend on
#[async_trait]
pub trait WorkspaceService: Send + Sync {
    /// Copy the starter template into the run's workspace and apply `plan`
    async fn apply_patch_plan(
        &self,
        run_id: &str,
        plan: &PatchPlan,
        options: ApplyOptions,
        log: &NodeLogger,
    ) -> Result<WorkspaceRef>;

    /// Start (or reuse) the dev server for a workspace
    async fn run_preview(
        &self,
        workspace_path: &str,
        hero_id: &str,
        start_port: u16,
        log: &NodeLogger,
    ) -> Result<PreviewRef>;

    /// Stop a workspace's dev server; `false` when none was tracked
    async fn stop_preview(&self, workspace_path: &str) -> Result<bool>;

    async fn create_placeholder_thumbnail(&self, hero_id: &str, title: &str) -> Result<Thumbnail>;
}

/// Lowercase, `[a-z0-9_-]` only, single dashes, never empty
pub fn sanitize_hero_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "hero".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Workspace-relative directory a hero's files live in
pub fn hero_root(hero_id: &str) -> String {
    format!("src/heroes/{}", sanitize_hero_id(hero_id))
}

/// Normalize a patch path to a clean relative POSIX path
///
/// Rejects paths that are empty or climb above the workspace root.
pub fn normalize_patch_path(raw: &str) -> Result<String> {
    let unified = raw.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    if segments.is_empty() || segments[0] == ".." {
        return Err(ServiceError::InvalidPatchPath(raw.to_string()));
    }
    Ok(segments.join("/"))
}

/// Normalize `raw` and require it to sit inside the hero's root
pub fn assert_allowed_patch_path(raw: &str, hero_id: &str) -> Result<String> {
    let normalized = normalize_patch_path(raw)?;
    let root = hero_root(hero_id);
    let inside = normalized == root
        || normalized
            .strip_prefix(&root)
            .is_some_and(|rest| rest.starts_with('/'));
    if !inside {
        return Err(ServiceError::PatchPathOutsideHero {
            path: normalized,
            root,
        });
    }
    Ok(normalized)
}

/// Absolute form of `path` with `.` and `..` resolved lexically
fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Absolute `candidate`, provided it lies within `base`
pub fn assert_inside(base: &Path, candidate: &Path) -> Result<PathBuf> {
    let base = absolutize(base)?;
    let candidate = absolutize(candidate)?;
    if candidate.starts_with(&base) {
        Ok(candidate)
    } else {
        Err(ServiceError::PathEscape)
    }
}

/// One entry of a hero's file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFileNode {
    pub name: String,
    /// Workspace-relative, `/`-separated
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileNodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WorkspaceFileNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNodeKind {
    File,
    Directory,
}

/// Filesystem-backed workspaces under `ServicesConfig::workspaces_dir`
pub struct LocalWorkspaceService {
    config: ServicesConfig,
    previews: Arc<PreviewRegistry>,
}

impl LocalWorkspaceService {
    pub fn new(config: ServicesConfig, previews: Arc<PreviewRegistry>) -> Self {
        Self { config, previews }
    }

    pub fn config(&self) -> &ServicesConfig {
        &self.config
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }

    /// Absolute workspace path, which must lie under the workspaces root
    pub fn resolve_workspace_path(&self, raw: &str) -> Result<PathBuf> {
        assert_inside(&self.config.workspaces_dir(), Path::new(raw))
    }

    /// Live preview for a workspace, if any
    pub fn preview_info(&self, workspace_path: &str) -> Result<Option<PreviewInfo>> {
        let workspace = self.resolve_workspace_path(workspace_path)?;
        Ok(self.previews.get(&workspace))
    }

    async fn ensure_runtime_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.config.workspaces_dir()).await?;
        fs::create_dir_all(self.config.thumbnails_dir()).await?;
        Ok(())
    }

    fn editable_path(&self, workspace: &Path, hero_id: &str, relative: &str) -> Result<PathBuf> {
        let normalized = assert_allowed_patch_path(relative, hero_id)?;
        assert_inside(workspace, &workspace.join(normalized))
    }

    /// Tree of the hero's files, directories first then by name
    pub async fn list_hero_files(
        &self,
        workspace_path: &str,
        hero_id: &str,
    ) -> Result<Vec<WorkspaceFileNode>> {
        let workspace = self.resolve_workspace_path(workspace_path)?;
        let root = assert_inside(&workspace, &workspace.join(hero_root(hero_id)))?;
        if !fs::try_exists(&root).await? {
            return Ok(Vec::new());
        }
        tokio::task::spawn_blocking(move || walk_tree(&root, &workspace))
            .await
            .map_err(std::io::Error::other)?
    }

    pub async fn read_hero_file(
        &self,
        workspace_path: &str,
        hero_id: &str,
        relative: &str,
    ) -> Result<String> {
        let workspace = self.resolve_workspace_path(workspace_path)?;
        let path = self.editable_path(&workspace, hero_id, relative)?;
        Ok(fs::read_to_string(path).await?)
    }

    pub async fn write_hero_file(
        &self,
        workspace_path: &str,
        hero_id: &str,
        relative: &str,
        content: &str,
    ) -> Result<()> {
        let workspace = self.resolve_workspace_path(workspace_path)?;
        let path = self.editable_path(&workspace, hero_id, relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkspaceService for LocalWorkspaceService {
    async fn apply_patch_plan(
        &self,
        run_id: &str,
        plan: &PatchPlan,
        options: ApplyOptions,
        log: &NodeLogger,
    ) -> Result<WorkspaceRef> {
        self.ensure_runtime_dirs().await?;

        let template = self.config.template_dir();
        if !fs::try_exists(&template).await? {
            return Err(ServiceError::TemplateMissing(template));
        }

        let workspaces = self.config.workspaces_dir();
        let workspace = assert_inside(&workspaces, &workspaces.join(run_id))?;
        if workspace == absolutize(&workspaces)? {
            return Err(ServiceError::PathEscape);
        }
        let hero_id = sanitize_hero_id(&plan.hero_id);

        if !options.keep_existing && fs::try_exists(&workspace).await? {
            fs::remove_dir_all(&workspace).await?;
        }
        copy_dir_all(&template, &workspace).await?;

        for op in &plan.ops {
            let relative = assert_allowed_patch_path(op.path(), &hero_id)?;
            let target = assert_inside(&workspace, &workspace.join(&relative))?;
            match op {
                FileOp::Mkdir { .. } => {
                    fs::create_dir_all(&target).await?;
                    log.log(format!("mkdir {}", relative));
                }
                FileOp::Write { content, .. } => {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent).await?;
                    }
                    fs::write(&target, content).await?;
                    log.log(format!("write {}", relative));
                }
            }
        }

        let marker = json!({
            "runId": run_id,
            "heroId": hero_id,
            "workspaceName": plan.workspace_name,
            "appliedOps": plan.ops.len(),
            "createdAt": format_timestamp(Utc::now()),
        });
        fs::write(
            workspace.join(WORKSPACE_MARKER),
            format!("{}\n", serde_json::to_string_pretty(&marker)?),
        )
        .await?;

        log::info!(
            "Applied {} ops for {} into {:?}",
            plan.ops.len(),
            hero_id,
            workspace
        );
        Ok(WorkspaceRef {
            path: workspace.display().to_string(),
            hero_id,
        })
    }

    async fn run_preview(
        &self,
        workspace_path: &str,
        hero_id: &str,
        start_port: u16,
        log: &NodeLogger,
    ) -> Result<PreviewRef> {
        let settings = &self.config.preview;
        preview::ensure_package_manager(&settings.package_manager).await?;

        let workspace = self.resolve_workspace_path(workspace_path)?;
        let hero_id = sanitize_hero_id(hero_id);
        preview::ensure_dependencies(&settings.package_manager, &workspace, log).await?;

        if let Some(existing) = self.previews.get(&workspace) {
            log.log(format!(
                "Reusing preview on port {} (pid {})",
                existing.port, existing.pid
            ));
            return Ok(PreviewRef {
                url: existing.url,
                port: existing.port,
                pid: existing.pid,
            });
        }

        let port = preview::find_free_port(start_port, settings.max_port).await?;
        let process =
            PreviewProcess::spawn(&settings.package_manager, &workspace, &hero_id, port)?;
        let preview = process.preview_ref();
        if let Some(replaced) = self.previews.insert(process) {
            replaced
                .stop(Duration::from_millis(settings.stop_grace_ms))
                .await?;
        }
        log.log(format!(
            "Started {} dev on port {} (pid {})",
            settings.package_manager, preview.port, preview.pid
        ));

        let ready = preview::wait_for_url(
            &preview.url,
            Duration::from_secs(settings.ready_timeout_secs),
            Duration::from_millis(settings.poll_interval_ms),
        )
        .await;
        if let Err(e) = ready {
            if let Some(process) = self.previews.remove(&workspace) {
                process
                    .stop(Duration::from_millis(settings.stop_grace_ms))
                    .await?;
            }
            return Err(e);
        }

        Ok(preview)
    }

    async fn stop_preview(&self, workspace_path: &str) -> Result<bool> {
        let workspace = self.resolve_workspace_path(workspace_path)?;
        let Some(process) = self.previews.remove(&workspace) else {
            return Ok(false);
        };
        process
            .stop(Duration::from_millis(self.config.preview.stop_grace_ms))
            .await?;
        log::info!("Stopped preview for {:?}", workspace);
        Ok(true)
    }

    async fn create_placeholder_thumbnail(&self, hero_id: &str, title: &str) -> Result<Thumbnail> {
        self.ensure_runtime_dirs().await?;
        let hero_id = sanitize_hero_id(hero_id);
        let file_name = format!("{}-{}.svg", hero_id, Utc::now().timestamp_millis());
        let absolute_path = absolutize(&self.config.thumbnails_dir().join(file_name))?;

        fs::write(&absolute_path, placeholder_svg(&hero_id, title)).await?;

        let cwd = std::env::current_dir()?;
        let relative_path = absolute_path
            .strip_prefix(&cwd)
            .unwrap_or(&absolute_path)
            .to_string_lossy()
            .replace('\\', "/");
        Ok(Thumbnail {
            absolute_path,
            relative_path,
        })
    }
}

fn placeholder_svg(hero_id: &str, title: &str) -> String {
    let safe_title: String = title.chars().filter(|c| *c != '<' && *c != '>').collect();
    format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" "##,
            r##"width="960" height="540" viewBox="0 0 960 540">"##,
            r##"<defs><linearGradient id="g" x1="0" y1="0" x2="1" y2="1">"##,
            r##"<stop offset="0%" stop-color="#111827"/>"##,
            r##"<stop offset="100%" stop-color="#0ea5a4"/>"##,
            r##"</linearGradient></defs><rect width="960" height="540" fill="url(#g)"/>"##,
            r##"<circle cx="760" cy="130" r="140" fill="#22d3ee" fill-opacity="0.2"/>"##,
            r##"<circle cx="220" cy="420" r="180" fill="#a78bfa" fill-opacity="0.18"/>"##,
            r##"<text x="68" y="240" fill="#f8fafc" font-size="56" "##,
            r##"font-family="Arial, sans-serif" font-weight="700">{}</text>"##,
            r##"<text x="70" y="300" fill="#cbd5e1" font-size="28" "##,
            r##"font-family="Arial, sans-serif">Hero ID: {}</text></svg>"##,
        ),
        safe_title, hero_id
    )
}

async fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source, target)) = pending.pop() {
        fs::create_dir_all(&target).await?;
        let mut entries = fs::read_dir(&source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let destination = target.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), destination));
            } else {
                fs::copy(entry.path(), destination).await?;
            }
        }
    }
    Ok(())
}

fn walk_tree(dir: &Path, workspace: &Path) -> Result<Vec<WorkspaceFileNode>> {
    let entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    let mut is_dir = Vec::with_capacity(entries.len());
    for entry in &entries {
        is_dir.push(entry.file_type()?.is_dir());
    }
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        is_dir[b]
            .cmp(&is_dir[a])
            .then_with(|| entries[a].file_name().cmp(&entries[b].file_name()))
    });

    let mut nodes = Vec::with_capacity(entries.len());
    for index in order {
        let entry = &entries[index];
        let path = entry.path();
        let relative = path
            .strip_prefix(workspace)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_dir[index] {
            nodes.push(WorkspaceFileNode {
                name,
                path: relative,
                kind: FileNodeKind::Directory,
                children: Some(walk_tree(&path, workspace)?),
            });
        } else {
            nodes.push(WorkspaceFileNode {
                name,
                path: relative,
                kind: FileNodeKind::File,
                children: None,
            });
        }
    }
    Ok(nodes)
}
