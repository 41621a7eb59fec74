//! PatchPlan Generate Node
//!
//! Turns a hero artifact into the deterministic set of files that render it
//! inside the starter workspace.

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::services::workspace::{hero_root, sanitize_hero_id};
use crate::values::{config_text_or, input_object, output, require, FileOp, PatchPlan};

const HEADLINE_MAX_CHARS: usize = 90;

const HERO_TSX: &str = r##"type HeroConfig = {
  heroId: string;
  title: string;
  headline: string;
  subheadline: string;
  ctaText: string;
  theme: {
    primaryColor: string;
    fontPreset?: string;
    theme?: "dark" | "light";
  };
  animation?: {
    preset?: string;
    speed?: number;
    intensity?: number;
  };
  image?: {
    path?: string;
  };
};

export default function Hero({ config }: { config: HeroConfig }) {
  const backgroundImage = "linear-gradient(135deg, " + config.theme.primaryColor + "40, #090C14 60%, #040608 100%)";

  return (
    <section className="relative min-h-[72vh] overflow-hidden rounded-3xl border border-white/10 px-8 py-14 shadow-[0_30px_80px_rgba(0,0,0,0.5)]" style={{ backgroundImage }}>
      <div className="absolute inset-0 pointer-events-none">
        <div className="absolute -top-20 -left-10 h-72 w-72 rounded-full blur-3xl" style={{ backgroundColor: config.theme.primaryColor + "55" }} />
        <div className="absolute bottom-0 right-0 h-64 w-64 rounded-full bg-cyan-500/10 blur-3xl" />
      </div>

      <div className="relative mx-auto flex max-w-6xl flex-col gap-10 md:flex-row md:items-center md:justify-between">
        <div className="max-w-2xl space-y-6">
          <p className="inline-flex rounded-full border border-white/20 bg-white/5 px-3 py-1 text-xs tracking-[0.18em] text-white/80 uppercase">
            {config.title}
          </p>
          <h1 className="text-4xl font-extrabold leading-tight text-white md:text-6xl">
            {config.headline}
          </h1>
          <p className="max-w-xl text-base text-slate-200 md:text-lg">
            {config.subheadline}
          </p>
          <button className="rounded-full px-6 py-3 text-sm font-semibold text-slate-950 transition hover:opacity-90" style={{ backgroundColor: config.theme.primaryColor }}>
            {config.ctaText}
          </button>
        </div>

        {config.image?.path ? (
          <div className="relative w-full max-w-sm overflow-hidden rounded-2xl border border-white/20 bg-black/30 p-2">
            <img src={config.image.path} alt={config.title} className="h-[380px] w-full rounded-xl object-cover" />
          </div>
        ) : null}
      </div>
    </section>
  );
}
"##;

const ANIMATION_TS: &str = r#"export default function applyHeroAnimation(config: { preset?: string; speed?: number; intensity?: number }) {
  return {
    enabled: true,
    preset: config.preset ?? "fadeUp",
    speed: config.speed ?? 1,
    intensity: config.intensity ?? 60,
  };
}
"#;

/// Contents of `config.json`, in the key order the template reads best in
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeroConfigFile<'a> {
    hero_id: &'a str,
    title: &'a str,
    headline: &'a str,
    subheadline: &'a str,
    cta_text: &'a str,
    theme: &'a Value,
    animation: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a Value>,
}

/// PatchPlan Generate Node
///
/// # Inputs
/// - `heroArtifact` (required)
/// - `jsonTheme` (optional) - Overrides the artifact's theme
/// - `jsonAnimation` (optional) - Overrides the artifact's animation
///
/// # Config
/// - `workspaceName`, `title`, `ctaText`
///
/// # Outputs
/// - `patchPlan` - One `mkdir` and three `write` ops under `src/heroes/<heroId>/`
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchPlanGenerateNode;

impl PatchPlanGenerateNode {
    pub const NODE_TYPE: &'static str = "patchplan.generate";
    pub const PORT_HERO_ARTIFACT: &'static str = "heroArtifact";
    pub const PORT_JSON_THEME: &'static str = "jsonTheme";
    pub const PORT_JSON_ANIMATION: &'static str = "jsonAnimation";
    pub const PORT_PATCH_PLAN: &'static str = "patchPlan";
}

impl TaskDescriptor for PatchPlanGenerateNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Generation, "PatchPlan Generate")
            .with_description("Create deterministic hero file patch operations")
            .with_input(PortMetadata::required(
                Self::PORT_HERO_ARTIFACT,
                "heroArtifact",
                PortDataType::HeroArtifact,
            ))
            .with_input(PortMetadata::optional(
                Self::PORT_JSON_THEME,
                "json(theme)",
                PortDataType::Json,
            ))
            .with_input(PortMetadata::optional(
                Self::PORT_JSON_ANIMATION,
                "json(animation)",
                PortDataType::Json,
            ))
            .with_output(PortMetadata::required(
                Self::PORT_PATCH_PLAN,
                "patchPlan",
                PortDataType::PatchPlan,
            ))
            .with_default_ports(Some(Self::PORT_HERO_ARTIFACT), Some(Self::PORT_PATCH_PLAN))
    }
}

fn text_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn object(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.is_object())
}

/// First `max - 3` characters plus an ellipsis when longer than `max`
fn headline(prompt: &str) -> String {
    if prompt.chars().count() > HEADLINE_MAX_CHARS {
        let cut: String = prompt.chars().take(HEADLINE_MAX_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        prompt.to_string()
    }
}

#[async_trait]
impl NodeExecutor for PatchPlanGenerateNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let artifact = require(
            input_object(&request.inputs, Self::PORT_HERO_ARTIFACT),
            "patchplan.generate requires heroArtifact input",
        )?;

        let hero_id = sanitize_hero_id(text_field(artifact, "heroId").unwrap_or("hero_generated"));
        let prompt =
            text_field(artifact, "prompt").unwrap_or("Build a bold superhero landing section");
        let title = config_text_or(request.config, "title", "Superhero Landing");
        let cta_text = config_text_or(request.config, "ctaText", "Launch now");
        let workspace_name = config_text_or(request.config, "workspaceName", "hero-workspace");

        let fallback_theme =
            json!({"theme": "dark", "primaryColor": "#22d3ee", "fontPreset": "cinematic-sans"});
        let fallback_animation = json!({"preset": "fadeUp", "speed": 1, "intensity": 60});
        let theme = object(request.inputs.get(Self::PORT_JSON_THEME))
            .or_else(|| object(artifact.get("theme")))
            .unwrap_or(&fallback_theme);
        let animation = object(request.inputs.get(Self::PORT_JSON_ANIMATION))
            .or_else(|| object(artifact.get("animation")))
            .unwrap_or(&fallback_animation);

        let subheadline = match text_field(artifact, "negativePrompt") {
            Some(negative) => format!("Optimized for clarity and impact. Avoid: {}.", negative),
            None => "Optimized for clarity, motion, and conversion-ready messaging.".to_string(),
        };
        let headline = headline(prompt);

        let config_file = HeroConfigFile {
            hero_id: &hero_id,
            title: &title,
            headline: &headline,
            subheadline: &subheadline,
            cta_text: &cta_text,
            theme,
            animation,
            image: object(artifact.get("image")),
        };

        let root = hero_root(&hero_id);
        let plan = PatchPlan {
            hero_id: hero_id.clone(),
            workspace_name,
            ops: vec![
                FileOp::Mkdir { path: root.clone() },
                FileOp::Write {
                    path: format!("{}/Hero.tsx", root),
                    content: HERO_TSX.to_string(),
                },
                FileOp::Write {
                    path: format!("{}/config.json", root),
                    content: format!("{}\n", serde_json::to_string_pretty(&config_file)?),
                },
                FileOp::Write {
                    path: format!("{}/animation.ts", root),
                    content: ANIMATION_TS.to_string(),
                },
            ],
        };

        request.log.log(format!(
            "Generated patch plan for {} with {} ops",
            hero_id,
            plan.ops.len()
        ));
        output(Self::PORT_PATCH_PLAN, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::execute;

    fn plan_of(output: &PortValues) -> PatchPlan {
        serde_json::from_value(output["patchPlan"].clone()).unwrap()
    }

    fn config_json(plan: &PatchPlan) -> Value {
        match &plan.ops[2] {
            FileOp::Write { content, .. } => serde_json::from_str(content).unwrap(),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plan_layout() {
        let outcome = execute(
            &PatchPlanGenerateNode,
            json!({}),
            json!({"heroArtifact": {"heroId": "hero_0123456789ab", "prompt": "Launch banner"}}),
        )
        .await;
        let plan = plan_of(outcome.output());

        assert_eq!(plan.hero_id, "hero_0123456789ab");
        assert_eq!(plan.workspace_name, "hero-workspace");
        let paths: Vec<&str> = plan.ops.iter().map(FileOp::path).collect();
        assert_eq!(
            paths,
            vec![
                "src/heroes/hero_0123456789ab",
                "src/heroes/hero_0123456789ab/Hero.tsx",
                "src/heroes/hero_0123456789ab/config.json",
                "src/heroes/hero_0123456789ab/animation.ts",
            ]
        );
        assert!(outcome.logged("Generated patch plan for hero_0123456789ab with 4 ops"));

        let config = config_json(&plan);
        assert_eq!(config["headline"], "Launch banner");
        assert_eq!(config["title"], "Superhero Landing");
        assert_eq!(config["theme"]["primaryColor"], "#22d3ee");
        assert_eq!(
            config["subheadline"],
            "Optimized for clarity, motion, and conversion-ready messaging."
        );
        assert!(config.get("image").is_none());
    }

    #[tokio::test]
    async fn test_wired_style_wins_over_artifact() {
        let outcome = execute(
            &PatchPlanGenerateNode,
            json!({"title": "Launch", "ctaText": "Go"}),
            json!({
                "heroArtifact": {
                    "heroId": "Hero X",
                    "prompt": "p".repeat(120),
                    "negativePrompt": "clutter",
                    "theme": {"theme": "light"},
                    "image": {"path": "a.png"}
                },
                "jsonTheme": {"theme": "dark", "primaryColor": "#000"}
            }),
        )
        .await;
        let plan = plan_of(outcome.output());
        assert_eq!(plan.hero_id, "hero-x");

        let config = config_json(&plan);
        assert_eq!(config["theme"]["primaryColor"], "#000");
        assert_eq!(config["animation"]["preset"], "fadeUp");
        assert_eq!(config["image"]["path"], "a.png");
        assert_eq!(config["ctaText"], "Go");
        assert_eq!(config["subheadline"], "Optimized for clarity and impact. Avoid: clutter.");
        let headline = config["headline"].as_str().unwrap();
        assert_eq!(headline.chars().count(), 90);
        assert!(headline.ends_with("..."));
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let outcome = execute(
            &PatchPlanGenerateNode,
            json!({}),
            json!({"heroArtifact": "nope"}),
        )
        .await;
        assert_eq!(outcome.error(), "patchplan.generate requires heroArtifact input");
    }

    #[test]
    fn test_headline_boundary() {
        assert_eq!(headline(&"x".repeat(90)).len(), 90);
        assert_eq!(headline(&"x".repeat(91)), format!("{}...", "x".repeat(87)));
    }
}
