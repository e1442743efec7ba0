//! Format-preserving editor for flat env.yaml documents.
//!
//! Values are read through `serde_yaml`, but writes only touch the byte span
//! of the rewritten scalar. Comments, key order, blank lines and the quoting
//! style of every line stay as they were.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde_yaml::Value;
use tracing::debug;

use crate::error::GkupError;

/// Value of a top-level key as read from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Scalar(String),
    /// Empty value or explicit `null`.
    Null,
    /// Mapping, sequence or tagged value; never rewritten.
    Nested,
}

/// A loaded env.yaml file: the original text plus its top-level fields.
#[derive(Debug, Clone)]
pub struct EnvFile {
    text: String,
    fields: Vec<(String, FieldValue)>,
}

impl EnvFile {
    /// Load an env file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GkupError::FileNotFound(path.display().to_string()).into());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read env file: {}", path.display()))?;

        let env_file = Self::parse(content)
            .with_context(|| format!("Failed to load env file: {}", path.display()))?;

        debug!(
            "Loaded {} fields from {}",
            env_file.fields.len(),
            path.display()
        );
        Ok(env_file)
    }

    /// Parse env file text. The document must be a top-level mapping.
    pub fn parse(text: impl Into<String>) -> Result<Self, GkupError> {
        let text = text.into();

        let document: Value =
            serde_yaml::from_str(&text).map_err(|e| GkupError::Yaml(e.to_string()))?;

        let fields = match document {
            Value::Null => Vec::new(),
            Value::Mapping(mapping) => mapping
                .into_iter()
                .filter_map(|(key, value)| {
                    scalar_to_string(&key).map(|k| (k, field_value(&value)))
                })
                .collect(),
            _ => {
                return Err(GkupError::Yaml(
                    "expected a top-level mapping of KEY: value pairs".to_string(),
                ));
            }
        };

        Ok(Self { text, fields })
    }

    /// Write the document back to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, &self.text)
            .with_context(|| format!("Failed to write env file: {}", path.display()))?;
        debug!("Saved env file {}", path.display());
        Ok(())
    }

    /// Current serialized text, including any in-memory edits.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Scalar value of a top-level key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.fields.iter().find(|(k, _)| k == key) {
            Some((_, FieldValue::Scalar(v))) => Some(v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Top-level keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Replace the scalar value of an existing top-level key.
    ///
    /// The key is never created. Only the value span on its line changes;
    /// the original quoting style is kept, and a plain scalar is switched to
    /// double quotes when the new value would not read back as a string.
    /// Keys holding a mapping or sequence are rejected as `UnsupportedLayout`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), GkupError> {
        let Some(index) = self.fields.iter().position(|(k, _)| k == key) else {
            return Err(GkupError::MissingField(key.to_string()));
        };
        if self.fields[index].1 == FieldValue::Nested {
            return Err(GkupError::UnsupportedLayout(key.to_string()));
        }

        let line_re = scalar_line_regex(key)?;
        let mut offset = 0;
        let mut edit = None;

        for line in self.text.split_inclusive('\n') {
            let body = line.trim_end_matches(['\n', '\r']);
            if let Some(caps) = line_re.captures(body) {
                edit = Some(match caps.name("value") {
                    Some(old) => (
                        offset + old.start()..offset + old.end(),
                        render_scalar(old.as_str(), value),
                    ),
                    None => {
                        let sep = caps
                            .name("sep")
                            .ok_or_else(|| GkupError::UnsupportedLayout(key.to_string()))?;
                        let pad = if sep.as_str().ends_with([' ', '\t']) { "" } else { " " };
                        // A comment needs whitespace before it to stay a comment.
                        let gap = match caps.name("trail") {
                            Some(trail) if !trail.as_str().is_empty() => " ",
                            _ => "",
                        };
                        (
                            offset + sep.end()..offset + sep.end(),
                            format!("{}{}{}", pad, render_scalar("", value), gap),
                        )
                    }
                });
                break;
            }
            offset += line.len();
        }

        let (range, replacement) =
            edit.ok_or_else(|| GkupError::UnsupportedLayout(key.to_string()))?;
        self.text.replace_range(range, &replacement);
        self.fields[index].1 = FieldValue::Scalar(value.to_string());

        debug!("Set {} to {}", key, value);
        Ok(())
    }
}

fn field_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        other => scalar_to_string(other).map_or(FieldValue::Nested, FieldValue::Scalar),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Matches `KEY: value  # comment` at column zero.
fn scalar_line_regex(key: &str) -> Result<Regex, GkupError> {
    let pattern = format!(
        r#"^{}(?P<sep>[ \t]*:[ \t]*)(?P<value>"(?:[^"\\]|\\.)*"|'(?:[^']|'')*'|[^\s#'"&*!|>{{\[][^#]*?)?(?P<trail>[ \t]*(?:#.*)?)$"#,
        regex::escape(key)
    );
    Regex::new(&pattern).map_err(|_| GkupError::UnsupportedLayout(key.to_string()))
}

/// Render `new` in the quoting style of `old`.
fn render_scalar(old: &str, new: &str) -> String {
    if old.starts_with('"') {
        double_quoted(new)
    } else if old.starts_with('\'') {
        format!("'{}'", new.replace('\'', "''"))
    } else if reads_back_as_string(new) {
        new.to_string()
    } else {
        double_quoted(new)
    }
}

fn double_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn reads_back_as_string(value: &str) -> bool {
    matches!(serde_yaml::from_str::<Value>(value), Ok(Value::String(s)) if s == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
# Cluster settings
KUBERNETES_VERSION: \"1.27.10-gke.1055000\"
MAIN_NODE_POOL_ACTIVE: a   # switch after verification
MAIN_NODE_POOL_A_KUBERNETES_VERSION: '1.27.10-gke.1055000'
MAIN_NODE_POOL_B_KUBERNETES_VERSION: 1.27.8-gke.1067004

REGION: europe-west1
";

    #[test]
    fn test_parse_reads_scalars_in_order() {
        let env = EnvFile::parse(SAMPLE).unwrap();
        assert_eq!(env.get("KUBERNETES_VERSION"), Some("1.27.10-gke.1055000"));
        assert_eq!(env.get("MAIN_NODE_POOL_ACTIVE"), Some("a"));
        assert_eq!(
            env.get("MAIN_NODE_POOL_B_KUBERNETES_VERSION"),
            Some("1.27.8-gke.1067004")
        );
        assert_eq!(env.get("UNKNOWN"), None);

        let keys: Vec<&str> = env.keys().collect();
        assert_eq!(keys.first(), Some(&"KUBERNETES_VERSION"));
        assert_eq!(keys.last(), Some(&"REGION"));
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        assert!(matches!(
            EnvFile::parse("- a\n- b\n"),
            Err(GkupError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_empty_document() {
        let env = EnvFile::parse("").unwrap();
        assert_eq!(env.keys().count(), 0);
    }

    #[test]
    fn test_set_preserves_double_quotes() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        env.set("KUBERNETES_VERSION", "1.27.11-gke.1062000").unwrap();
        assert!(
            env.text()
                .contains("KUBERNETES_VERSION: \"1.27.11-gke.1062000\"\n")
        );
        assert_eq!(env.get("KUBERNETES_VERSION"), Some("1.27.11-gke.1062000"));
    }

    #[test]
    fn test_set_preserves_single_quotes() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        env.set("MAIN_NODE_POOL_A_KUBERNETES_VERSION", "1.27.11-gke.1062000")
            .unwrap();
        assert!(
            env.text()
                .contains("MAIN_NODE_POOL_A_KUBERNETES_VERSION: '1.27.11-gke.1062000'\n")
        );
    }

    #[test]
    fn test_set_preserves_trailing_comment() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        env.set("MAIN_NODE_POOL_ACTIVE", "b").unwrap();
        assert!(
            env.text()
                .contains("MAIN_NODE_POOL_ACTIVE: b   # switch after verification\n")
        );
    }

    #[test]
    fn test_set_only_changes_value_bytes() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        env.set("MAIN_NODE_POOL_B_KUBERNETES_VERSION", "1.27.11-gke.1062000")
            .unwrap();
        let expected = SAMPLE.replace(
            "MAIN_NODE_POOL_B_KUBERNETES_VERSION: 1.27.8-gke.1067004",
            "MAIN_NODE_POOL_B_KUBERNETES_VERSION: 1.27.11-gke.1062000",
        );
        assert_eq!(env.text(), expected);
    }

    #[test]
    fn test_set_quotes_plain_value_that_would_not_be_a_string() {
        let mut env = EnvFile::parse("KUBERNETES_VERSION: 1.27.10-gke.1\n").unwrap();
        env.set("KUBERNETES_VERSION", "1.28").unwrap();
        assert_eq!(env.text(), "KUBERNETES_VERSION: \"1.28\"\n");
        assert_eq!(EnvFile::parse(env.text()).unwrap().get("KUBERNETES_VERSION"), Some("1.28"));
    }

    #[test]
    fn test_set_keeps_crlf_line_endings() {
        let mut env = EnvFile::parse("A: x\r\nB: y\r\n").unwrap();
        env.set("A", "z").unwrap();
        assert_eq!(env.text(), "A: z\r\nB: y\r\n");
    }

    #[test]
    fn test_set_does_not_touch_prefixed_keys() {
        let text = "ECK_KUBERNETES_VERSION: 1.0.0\nKUBERNETES_VERSION: 1.0.0\n";
        let mut env = EnvFile::parse(text).unwrap();
        env.set("KUBERNETES_VERSION", "2.0.0").unwrap();
        assert_eq!(
            env.text(),
            "ECK_KUBERNETES_VERSION: 1.0.0\nKUBERNETES_VERSION: 2.0.0\n"
        );
    }

    #[test]
    fn test_set_empty_value() {
        let mut env = EnvFile::parse("KUBERNETES_VERSION:\nOTHER: x\n").unwrap();
        env.set("KUBERNETES_VERSION", "1.27.11-gke.1").unwrap();
        assert_eq!(env.text(), "KUBERNETES_VERSION: 1.27.11-gke.1\nOTHER: x\n");
    }

    #[test]
    fn test_set_empty_value_before_comment() {
        let mut env = EnvFile::parse("KEY: # c\nOTHER: x\n").unwrap();
        env.set("KEY", "v").unwrap();
        assert_eq!(env.text(), "KEY: v # c\nOTHER: x\n");

        let reparsed = EnvFile::parse(env.text()).unwrap();
        assert_eq!(reparsed.get("KEY"), Some("v"));
    }

    #[test]
    fn test_set_empty_value_reads_as_present() {
        let env = EnvFile::parse("KUBERNETES_VERSION:\n").unwrap();
        assert!(env.contains_key("KUBERNETES_VERSION"));
        assert_eq!(env.get("KUBERNETES_VERSION"), None);
    }

    #[test]
    fn test_set_nested_value_is_unsupported() {
        let text = "KUBERNETES_VERSION:\n  pinned: 1.27.8-gke.1\nPOOLS:\n  - a\n";
        let mut env = EnvFile::parse(text).unwrap();
        assert!(env.contains_key("KUBERNETES_VERSION"));
        assert_eq!(env.get("KUBERNETES_VERSION"), None);

        for key in ["KUBERNETES_VERSION", "POOLS"] {
            assert!(matches!(
                env.set(key, "1.27.11-gke.2"),
                Err(GkupError::UnsupportedLayout(k)) if k == key
            ));
        }
        assert_eq!(env.text(), text);
    }

    #[test]
    fn test_set_missing_key_is_not_created() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        let result = env.set("ECK_NODE_POOL_A_KUBERNETES_VERSION", "1.27.11-gke.1");
        assert!(matches!(result, Err(GkupError::MissingField(_))));
        assert_eq!(env.text(), SAMPLE);
    }

    #[test]
    fn test_set_flow_mapping_is_unsupported() {
        let mut env = EnvFile::parse("{KUBERNETES_VERSION: 1.27.1}\n").unwrap();
        assert!(matches!(
            env.set("KUBERNETES_VERSION", "1.27.2"),
            Err(GkupError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EnvFile::load("/nonexistent/env.yaml").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GkupError>(),
            Some(GkupError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_and_save_round_trip() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE.as_bytes()).unwrap();

        let mut env = EnvFile::load(temp_file.path()).unwrap();
        env.set("MAIN_NODE_POOL_ACTIVE", "b").unwrap();
        env.save(temp_file.path()).unwrap();

        let reloaded = EnvFile::load(temp_file.path()).unwrap();
        assert_eq!(reloaded.get("MAIN_NODE_POOL_ACTIVE"), Some("b"));
        assert_eq!(reloaded.text(), env.text());
    }
}
