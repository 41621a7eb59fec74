//! Registry setup for host applications.
//!
//! Hosts build a [`Services`] bundle once at startup and hand it to
//! [`builtin_registry`]. Node executors only hold the trait objects, so tests
//! and alternative hosts can swap any collaborator.
//!
//! # Example
//!
//! ```ignore
//! let config = workflow_nodes::ServicesConfig::load("workbench.json")?;
//! let services = workflow_nodes::Services::local(&config, Arc::new(PreviewRegistry::new()))?;
//! let registry = workflow_nodes::builtin_registry(&services);
//! ```

use std::sync::Arc;

use node_engine::NodeRegistry;

use crate::config::ServicesConfig;
use crate::error::Result;
use crate::kind::NodeKind;
use crate::services::{
    HeroCatalog, JsonHeroCatalog, LocalWorkspaceService, OpenRouterVisionService,
    PreviewRegistry, VisionPromptService, WorkspaceService,
};

/// External collaborators the built-in nodes call
#[derive(Clone)]
pub struct Services {
    pub workspace: Arc<dyn WorkspaceService>,
    pub vision: Arc<dyn VisionPromptService>,
    pub catalog: Arc<dyn HeroCatalog>,
}

impl Services {
    /// Filesystem workspaces, OpenRouter vision and a JSON catalog
    pub fn local(config: &ServicesConfig, previews: Arc<PreviewRegistry>) -> Result<Self> {
        log::info!("Using data directory {:?}", config.data_dir);
        Ok(Self {
            workspace: Arc::new(LocalWorkspaceService::new(config.clone(), previews)),
            vision: Arc::new(OpenRouterVisionService::new(config.vision.clone())?),
            catalog: Arc::new(JsonHeroCatalog::new(config.catalog_path())),
        })
    }
}

/// A registry holding every built-in node kind
pub fn builtin_registry(services: &Services) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    for kind in NodeKind::ALL {
        registry.register(kind.descriptor(), kind.executor(services));
    }
    log::debug!("Registered {} built-in node types", NodeKind::ALL.len());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_services;
    use node_engine::{NodeCategory, PortDataType};

    #[test]
    fn test_registry_has_all_builtins() {
        let registry = builtin_registry(&fake_services());
        assert_eq!(registry.all_metadata().len(), 11);
        for kind in NodeKind::ALL {
            assert!(registry.has_node_type(kind.engine_type()));
        }
        assert!(registry.resolve("hero.render").is_err());
    }

    #[test]
    fn test_port_signatures() {
        let registry = builtin_registry(&fake_services());
        let signature = |node_type: &str| {
            let meta = registry.get_metadata(node_type).unwrap();
            let inputs: Vec<(String, PortDataType, bool)> = meta
                .inputs
                .iter()
                .map(|p| (p.id.clone(), p.data_type, p.required))
                .collect();
            let outputs: Vec<(String, PortDataType)> = meta
                .outputs
                .iter()
                .map(|p| (p.id.clone(), p.data_type))
                .collect();
            (inputs, outputs)
        };
        let port = |id: &str, t: PortDataType| (id.to_string(), t);
        let input = |id: &str, t: PortDataType, required: bool| (id.to_string(), t, required);

        assert_eq!(
            signature("hero.generate"),
            (
                vec![
                    input("text", PortDataType::Text, true),
                    input("jsonTheme", PortDataType::Json, false),
                    input("jsonAnimation", PortDataType::Json, false),
                    input("image", PortDataType::Image, false),
                    input("negative", PortDataType::Text, false),
                ],
                vec![port("heroArtifact", PortDataType::HeroArtifact)]
            )
        );
        assert_eq!(
            signature("hero.publish"),
            (
                vec![
                    input("heroArtifact", PortDataType::HeroArtifact, true),
                    input("workspace", PortDataType::Workspace, true),
                    input("preview", PortDataType::Preview, true),
                ],
                vec![port("json", PortDataType::Json)]
            )
        );
        assert_eq!(
            signature("workspace.apply"),
            (
                vec![input("patchPlan", PortDataType::PatchPlan, true)],
                vec![port("workspace", PortDataType::Workspace)]
            )
        );
        assert_eq!(
            signature("input.image").1,
            vec![port("image", PortDataType::Image), port("text", PortDataType::Text)]
        );
    }

    #[test]
    fn test_categories() {
        let registry = builtin_registry(&fake_services());
        let by_category = registry.metadata_by_category();
        assert_eq!(by_category[&NodeCategory::Inputs].len(), 1);
        assert_eq!(by_category[&NodeCategory::Prompts].len(), 3);
        assert_eq!(by_category[&NodeCategory::Generation].len(), 3);
        assert_eq!(by_category[&NodeCategory::Output].len(), 4);
    }

    #[test]
    fn test_local_services() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = ServicesConfig::with_data_dir(temp.path());
        let services = Services::local(&config, Arc::new(PreviewRegistry::new())).unwrap();
        assert_eq!(builtin_registry(&services).node_types().len(), 11);
    }
}
