//! Generates the skeleton of a new provider integration and wires it into
//! the registry.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::info;

use crate::error::{Result, ToolError};

const ENV_FILE: &str = ".env";
const ENV_TEMPLATE_FILE: &str = ".env.example";
const PROVIDERS_DIR: &str = "src/providers";
const REGISTRY_FILE: &str = "src/providers/mod.rs";

/// One `KEY=value` pair given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarDecl {
    pub key: String,
    pub value: String,
}

impl EnvVarDecl {
    /// Splits `KEY=value`. A missing `=` leaves the value empty.
    ///
    /// Values end up double-quoted in `.env`, so quotes, backslashes and line
    /// breaks are refused.
    pub fn parse(raw: &str) -> Result<Self> {
        let (key, value) = raw.split_once('=').unwrap_or((raw, ""));
        let key = key.trim();
        if key.is_empty() {
            return Err(ToolError::Scaffold(format!(
                "environment variable declaration '{raw}' has no name"
            )));
        }
        let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(regex_error)?;
        if !pattern.is_match(key) {
            return Err(ToolError::Scaffold(format!(
                "'{key}' is not a valid environment variable name"
            )));
        }
        let value = value.trim();
        if value.contains(['"', '\\', '\n', '\r']) {
            return Err(ToolError::Scaffold(format!(
                "value of {key} must not contain quotes, backslashes or line breaks"
            )));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Files touched by a successful scaffold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub module: PathBuf,
    pub registry: PathBuf,
    pub env_file: PathBuf,
    pub env_template: PathBuf,
}

/// Adds integration `name` to the project rooted at `root`.
pub fn scaffold(root: &Path, name: &str, vars: &[EnvVarDecl]) -> Result<ScaffoldReport> {
    validate_name(name)?;
    if vars.is_empty() {
        return Err(ToolError::Scaffold(
            "at least one environment variable is required".into(),
        ));
    }

    let module = root.join(PROVIDERS_DIR).join(format!("{name}.rs"));
    if module.exists() {
        return Err(ToolError::Scaffold(format!(
            "{} already exists",
            module.display()
        )));
    }
    let registry = root.join(REGISTRY_FILE);
    let registry_source = fs::read_to_string(&registry)?;
    let updated_registry = register_integration(&registry_source, name)?;

    let env_file = root.join(ENV_FILE);
    let env_template = root.join(ENV_TEMPLATE_FILE);
    append_env_templates(&env_file, &env_template, name, vars)?;
    info!(env = %env_file.display(), template = %env_template.display(), "environment variables added");

    fs::write(&module, render_module(name, vars))?;
    info!(module = %module.display(), "integration module created");

    fs::write(&registry, updated_registry)?;
    info!(registry = %registry.display(), "registry updated");

    Ok(ScaffoldReport {
        module,
        registry,
        env_file,
        env_template,
    })
}

/// Module names must be lowercase Rust identifiers.
pub fn validate_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[a-z][a-z0-9_]*$").map_err(regex_error)?;
    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(ToolError::Scaffold(format!(
            "'{name}' is not a valid integration name (lowercase letters, digits and '_')"
        )))
    }
}

/// Appends a `# NAME` section to both environment files: real values go to
/// `env_file`, empty placeholders to `env_template`.
pub fn append_env_templates(
    env_file: &Path,
    env_template: &Path,
    name: &str,
    vars: &[EnvVarDecl],
) -> Result<()> {
    let section = format!("\n# {}\n", name.to_uppercase());

    let mut values = section.clone();
    let mut placeholders = section;
    for var in vars {
        values.push_str(&format!("{}=\"{}\"\n", var.key, var.value));
        placeholders.push_str(&format!("{}=\"\"\n", var.key));
    }

    append(env_file, &values)?;
    append(env_template, &placeholders)
}

fn append(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Type name of the unit struct generated for `name`: `foo_bar` → `FooBar`.
pub fn type_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Source of the stub module for a new integration.
pub fn render_module(name: &str, vars: &[EnvVarDecl]) -> String {
    let type_name = type_name(name);
    let base_url = format!("{}_BASE_URL", name.to_uppercase());
    let variables = vars
        .iter()
        .map(|var| format!("\"{}\"", var.key))
        .collect::<Vec<_>>()
        .join(", ");
    let (config_param, base_url_lookup) = if vars.iter().any(|var| var.key == base_url) {
        (
            "config",
            format!("        let _base_url = config.base_url(\"{base_url}\")?;\n"),
        )
    } else {
        ("_config", String::new())
    };

    format!(
        r#"use tracing::{{info, instrument}};

use crate::config::ProviderConfig;
use crate::dates::{{DateRange, iso}};
use crate::error::Result;
use crate::model::DateKeyedResults;
use crate::providers::Integration;

const NAME: &str = "{name}";

pub struct {type_name};

impl Integration for {type_name} {{
    fn name(&self) -> &'static str {{
        NAME
    }}

    fn required_variables(&self) -> &'static [&'static str] {{
        &[{variables}]
    }}

    // TODO: return true once fetch talks to the provider.
    fn ready(&self) -> bool {{
        false
    }}

    #[instrument(level = "info", skip_all, fields(provider = NAME))]
    fn fetch(&self, {config_param}: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults> {{
{base_url_lookup}        let results = DateKeyedResults::new();

        for date in range.dates() {{
            info!(date = %iso(date), "checking date");
            // TODO: fetch routes and itineraries, then push them into `results`.
        }}

        Ok(results)
    }}
}}
"#
    )
}

/// Declares `name` as a provider module and appends it to `REGISTRY`.
pub fn register_integration(source: &str, name: &str) -> Result<String> {
    let declaration = format!("pub mod {name};");
    if source.lines().any(|line| line.trim() == declaration) {
        return Err(ToolError::Scaffold(format!(
            "integration '{name}' is already registered"
        )));
    }

    let modules = Regex::new(r"(?m)^pub mod [a-z0-9_]+;\n").map_err(regex_error)?;
    let insert_at = modules
        .find_iter(source)
        .last()
        .map(|found| found.end())
        .ok_or_else(|| ToolError::Scaffold("no provider module declarations found".into()))?;
    let mut updated = String::with_capacity(source.len() + 64);
    updated.push_str(&source[..insert_at]);
    updated.push_str(&declaration);
    updated.push('\n');
    updated.push_str(&source[insert_at..]);

    let registry = Regex::new(r"(?s)(pub static REGISTRY: &\[&dyn Integration\] = &\[)(.*?)(\n\];)")
        .map_err(regex_error)?;
    if !registry.is_match(&updated) {
        return Err(ToolError::Scaffold("REGISTRY declaration not found".into()));
    }
    let entry = format!("\n    &{name}::{},", type_name(name));
    let updated = registry.replacen(&updated, 1, |caps: &regex::Captures<'_>| {
        format!("{}{}{}{}", &caps[1], &caps[2], entry, &caps[3])
    });

    Ok(updated.into_owned())
}

fn regex_error(err: regex::Error) -> ToolError {
    ToolError::Scaffold(err.to_string())
}
