// src/core/template_engine.rs
//! HTML template registry: built-in CV and letter templates, optionally
//! overridden or extended from a templates directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::Tera;

use crate::app_log;
use crate::error::{CvResult, CvToolError};

pub const DEFAULT_CV_TEMPLATE: &str = "modern";
pub const LETTER_TEMPLATE: &str = "letter";

// ===== Template Models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Cv,
    Letter,
}

fn default_kind() -> TemplateKind {
    TemplateKind::Cv
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateManifest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: TemplateKind,
    pub main_file: Option<String>,
    /// Other ids accepted for this template.
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: TemplateKind,
}

struct BuiltinTemplate {
    id: &'static str,
    manifest: &'static str,
    html: &'static str,
}

const BUILTIN_TEMPLATES: &[BuiltinTemplate] = &[
    BuiltinTemplate {
        id: "modern",
        manifest: include_str!("../../templates/modern/manifest.toml"),
        html: include_str!("../../templates/modern/template.html"),
    },
    BuiltinTemplate {
        id: "executive",
        manifest: include_str!("../../templates/executive/manifest.toml"),
        html: include_str!("../../templates/executive/template.html"),
    },
    BuiltinTemplate {
        id: "letter",
        manifest: include_str!("../../templates/letter/manifest.toml"),
        html: include_str!("../../templates/letter/template.html"),
    },
];

/// Tera name; the `.html` suffix turns on autoescaping.
fn tera_name(id: &str) -> String {
    format!("{}/template.html", id)
}

// ===== Main Template Engine =====

pub struct TemplateEngine {
    templates_dir: PathBuf,
    tera: Tera,
    templates: Vec<TemplateInfo>,
    aliases: HashMap<String, String>,
}

impl TemplateEngine {
    /// Built-in templates plus whatever `templates_dir` provides. A directory
    /// template with a built-in id replaces the built-in.
    pub fn new(templates_dir: PathBuf) -> Result<Self> {
        let mut engine = Self {
            templates_dir,
            tera: Tera::default(),
            templates: Vec::new(),
            aliases: HashMap::new(),
        };

        for builtin in BUILTIN_TEMPLATES {
            let manifest: TemplateManifest = toml::from_str(builtin.manifest)
                .with_context(|| format!("Invalid built-in manifest for {}", builtin.id))?;
            engine.register(builtin.id, manifest, builtin.html)?;
        }

        engine.discover_templates()?;
        Ok(engine)
    }

    fn discover_templates(&mut self) -> Result<()> {
        if !self.templates_dir.exists() {
            app_log!(
                debug,
                "Templates directory {} not found, using built-in templates",
                self.templates_dir.display()
            );
            return Ok(());
        }

        let entries = std::fs::read_dir(&self.templates_dir).with_context(|| {
            format!(
                "Failed to read templates directory: {}",
                self.templates_dir.display()
            )
        })?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(template_id) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            match load_template_dir(&path) {
                Ok((manifest, html)) => {
                    if let Err(e) = self.register(&template_id, manifest, &html) {
                        app_log!(warn, "Failed to register template {}: {:#}", template_id, e);
                    }
                }
                Err(e) => app_log!(warn, "Failed to load template {}: {:#}", template_id, e),
            }
        }

        app_log!(info, "{} templates available", self.templates.len());
        Ok(())
    }

    fn register(&mut self, id: &str, manifest: TemplateManifest, html: &str) -> Result<()> {
        let id = id.to_lowercase();
        self.tera
            .add_raw_template(&tera_name(&id), html)
            .with_context(|| format!("Template {} does not compile", id))?;

        for alias in &manifest.aliases {
            self.aliases.insert(alias.to_lowercase(), id.clone());
        }

        let info = TemplateInfo {
            id: id.clone(),
            name: manifest.name,
            description: manifest.description.unwrap_or_default(),
            kind: manifest.kind,
        };
        match self.templates.iter_mut().find(|t| t.id == id) {
            Some(existing) => *existing = info,
            None => self.templates.push(info),
        }
        Ok(())
    }

    pub fn list_templates(&self) -> &[TemplateInfo] {
        &self.templates
    }

    pub fn templates_of(&self, kind: TemplateKind) -> Vec<&TemplateInfo> {
        self.templates.iter().filter(|t| t.kind == kind).collect()
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Canonical id for a requested template name or alias. Nothing requested
    /// means the default of that kind; anything unknown is a `Render` error.
    pub fn resolve(&self, requested: Option<&str>, kind: TemplateKind) -> CvResult<String> {
        let requested = requested.map(|r| r.trim().to_lowercase()).unwrap_or_default();
        if requested.is_empty() {
            return Ok(match kind {
                TemplateKind::Cv => DEFAULT_CV_TEMPLATE,
                TemplateKind::Letter => LETTER_TEMPLATE,
            }
            .to_string());
        }

        let id = self.aliases.get(&requested).cloned().unwrap_or(requested);
        match self.templates.iter().find(|t| t.id == id) {
            Some(template) if template.kind == kind => Ok(template.id.clone()),
            _ => {
                let available: Vec<&str> = self.templates_of(kind).iter().map(|t| t.id.as_str()).collect();
                Err(CvToolError::Render(format!(
                    "Unknown template '{}'. Available templates: {}",
                    id,
                    available.join(", ")
                )))
            }
        }
    }

    pub fn render(&self, template_id: &str, context: &tera::Context) -> CvResult<String> {
        self.tera.render(&tera_name(template_id), context).map_err(|e| {
            let mut message = e.to_string();
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
            CvToolError::Render(format!("Template {} failed to render: {}", template_id, message))
        })
    }
}

fn load_template_dir(path: &Path) -> Result<(TemplateManifest, String)> {
    let manifest_path = path.join("manifest.toml");
    let content = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;
    let manifest: TemplateManifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", manifest_path.display()))?;

    let main_file = path.join(manifest.main_file.as_deref().unwrap_or("template.html"));
    let html = std::fs::read_to_string(&main_file)
        .with_context(|| format!("Failed to read template: {}", main_file.display()))?;

    Ok((manifest, html))
}
