use crate::controller::FieldInput;
use crate::model::FormSpec;
use crate::snapshot::Value;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SCHEMA_FILE: &str = "chi-form.yaml";

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Keys a field entry may carry across all field types.
const FIELD_KEYS: &[&str] = &[
    "name",
    "label",
    "type",
    "required",
    "visible_when",
    "min",
    "max",
    "step",
    "options",
];

/// Parse a form spec from text; JSON when `json` is set, YAML otherwise.
pub fn parse_spec(text: &str, json: bool) -> Result<FormSpec> {
    let spec: FormSpec = if json {
        serde_json::from_str(text).context("parsing form JSON")?
    } else {
        serde_yaml::from_str(text).context("parsing form YAML")?
    };
    let raw = if json {
        serde_json::from_str::<serde_json::Value>(text).ok()
    } else {
        serde_yaml::from_str::<serde_json::Value>(text).ok()
    };
    if let Some(raw) = raw {
        for key in unknown_field_keys(&raw) {
            warn!(key = %key, "ignoring unknown field key");
        }
    }
    Ok(spec)
}

/// `field.key` for every key on a field entry that no field type reads.
/// Field entries flatten their type's keys, so serde cannot reject these.
pub fn unknown_field_keys(raw: &serde_json::Value) -> Vec<String> {
    let Some(fields) = raw.get("fields").and_then(|f| f.as_array()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let Some(obj) = field.as_object() else {
            continue;
        };
        let name = obj
            .get("name")
            .and_then(|n| n.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{i}"));
        for key in obj.keys() {
            if !FIELD_KEYS.contains(&key.as_str()) {
                out.push(format!("{name}.{key}"));
            }
        }
    }
    out
}

pub fn load_spec(path: &Path) -> Result<FormSpec> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    parse_spec(&s, is_json(path)).with_context(|| format!("loading {path:?}"))
}

/// Look for `chi-form.yaml` in `cwd`, `cwd/.tui`, then `<ancestor>/.tui`.
pub fn discover_from(cwd: &Path) -> Option<PathBuf> {
    let candidates = [cwd.join(SCHEMA_FILE), cwd.join(".tui").join(SCHEMA_FILE)];
    if let Some(p) = candidates.iter().find(|p| p.exists()) {
        return Some(p.clone());
    }
    let mut cur = cwd;
    while let Some(parent) = cur.parent() {
        let p = parent.join(".tui").join(SCHEMA_FILE);
        if p.exists() {
            return Some(p);
        }
        cur = parent;
    }
    None
}

/// Resolve the schema path: explicit argument, then `CHI_FORM_SCHEMA`, then
/// discovery from the working directory.
pub fn resolve_spec_path(arg: Option<String>) -> Result<PathBuf> {
    if let Some(a) = arg {
        return Ok(PathBuf::from(a));
    }
    if let Ok(p) = std::env::var("CHI_FORM_SCHEMA") {
        return Ok(PathBuf::from(p));
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    discover_from(&cwd).ok_or_else(|| {
        anyhow!(
            "No form schema found. Pass a path, set CHI_FORM_SCHEMA, or place {SCHEMA_FILE} in CWD/.tui and ancestors"
        )
    })
}

/// One scripted step for headless runs.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    #[serde(default)]
    pub edit: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, PartialEq)]
pub enum ScriptAction {
    Edit { field: String, input: FieldInput },
    Submit,
}

impl ScriptStep {
    pub fn action(&self) -> Result<ScriptAction> {
        if self.submit {
            return Ok(ScriptAction::Submit);
        }
        let field = self
            .edit
            .clone()
            .ok_or_else(|| anyhow!("script step needs 'edit' or 'submit'"))?;
        let input = match (&self.value, &self.start, &self.end) {
            (Some(v), None, None) => match v {
                Value::Text(s) => FieldInput::Raw(s.clone()),
                Value::Number(n) => FieldInput::Raw(n.to_string()),
                other => FieldInput::Set(other.clone()),
            },
            (None, Some(s), None) => FieldInput::start(s.clone()),
            (None, None, Some(e)) => FieldInput::end(e.clone()),
            _ => {
                return Err(anyhow!(
                    "script step for '{field}' needs exactly one of value/start/end"
                ))
            }
        };
        Ok(ScriptAction::Edit { field, input })
    }
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptAction>> {
    let steps: Vec<ScriptStep> = serde_yaml::from_str(text).context("parsing script")?;
    steps.iter().map(ScriptStep::action).collect()
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptAction>> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    parse_script(&s).with_context(|| format!("loading {path:?}"))
}
