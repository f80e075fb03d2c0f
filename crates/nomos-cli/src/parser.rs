// SPDX-License-Identifier: MIT OR Apache-2.0
//! A minimal built-in [`FileParser`]. The `.csl` grammar itself is an
//! external collaborator's concern, out of scope for the core compiler;
//! this reads each source file as YAML, treating a reserved top-level
//! `sources:` key as the file's `source "alias" { type = ... }`
//! declarations and any scalar of the form `@alias:a.b.c` as a
//! reference, the literal notation already used by
//! [`nomos_core::Reference`]'s own doc comment.
//!
//! A single-key mapping `{secret: <value>}` marks that value as a
//! [`nomos_core::Value::Secret`] leaf. This is a pragmatic stand-in, not
//! a claim that YAML is the scripting language's surface syntax.

use nomos_compile::{FileParser, ParseError, ParsedFile};
use nomos_core::{Expr, SourceDecl, Value};
use nomos_error::SourceSpan;
use std::collections::BTreeMap;
use std::path::Path;

const SOURCES_KEY: &str = "sources";
const SECRET_KEY: &str = "secret";

/// Reads `.csl` files as YAML with the `sources:`/`@alias:path`/
/// `{secret: ...}` conventions described at module level.
#[derive(Debug, Default)]
pub struct YamlFileParser;

impl FileParser for YamlFileParser {
    fn parse(&self, path: &Path, vars: &BTreeMap<String, Value>) -> Result<ParsedFile, ParseError> {
        let file = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ParseError {
            file: file.clone(),
            message: e.to_string(),
        })?;
        let substituted = substitute_vars(&raw, vars);

        let doc: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| ParseError {
                file: file.clone(),
                message: e.to_string(),
            })?;

        let mut source_decls = Vec::new();
        let mut data = BTreeMap::new();

        if let serde_yaml::Value::Mapping(map) = doc {
            for (k, v) in map {
                let Some(key) = k.as_str() else { continue };
                if key == SOURCES_KEY {
                    source_decls = parse_sources(&v, &file)?;
                    continue;
                }
                data.insert(key.to_string(), to_value(&v, &file));
            }
        }

        Ok(ParsedFile {
            source_decls,
            tree: Value::Mapping(data),
        })
    }
}

fn parse_sources(v: &serde_yaml::Value, file: &str) -> Result<Vec<SourceDecl>, ParseError> {
    let serde_yaml::Value::Sequence(entries) = v else {
        return Err(ParseError {
            file: file.to_string(),
            message: "sources: must be a sequence".to_string(),
        });
    };

    let mut decls = Vec::with_capacity(entries.len());
    for entry in entries {
        let serde_yaml::Value::Mapping(m) = entry else {
            return Err(ParseError {
                file: file.to_string(),
                message: "each sources entry must be a mapping".to_string(),
            });
        };
        let alias = m
            .get("alias")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError {
                file: file.to_string(),
                message: "sources entry missing string 'alias'".to_string(),
            })?
            .to_string();
        let r#type = m
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError {
                file: file.to_string(),
                message: format!("source {alias:?} missing string 'type'"),
            })?
            .to_string();
        let mut config = BTreeMap::new();
        if let Some(serde_yaml::Value::Mapping(cfg)) = m.get("config") {
            for (ck, cv) in cfg {
                if let Some(ck) = ck.as_str() {
                    config.insert(ck.to_string(), to_expr(cv, file));
                }
            }
        }
        decls.push(SourceDecl {
            alias,
            r#type,
            config,
        });
    }
    Ok(decls)
}

fn to_value(v: &serde_yaml::Value, file: &str) -> Value {
    match v {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or_default())),
        serde_yaml::Value::String(s) => parse_scalar_string(s, file),
        serde_yaml::Value::Sequence(items) => {
            Value::Sequence(items.iter().map(|i| to_value(i, file)).collect())
        }
        serde_yaml::Value::Mapping(m) => {
            if let Some(secret) = single_secret_entry(m) {
                return Value::Secret(Box::new(to_value(secret, file)));
            }
            Value::Mapping(
                m.iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), to_value(v, file))))
                    .collect(),
            )
        }
        serde_yaml::Value::Tagged(t) => to_value(&t.value, file),
    }
}

fn to_expr(v: &serde_yaml::Value, file: &str) -> Expr {
    match v {
        serde_yaml::Value::Null => Expr::Null,
        serde_yaml::Value::Bool(b) => Expr::Bool(*b),
        serde_yaml::Value::Number(n) => n
            .as_i64()
            .map(Expr::Int)
            .unwrap_or_else(|| Expr::Float(n.as_f64().unwrap_or_default())),
        serde_yaml::Value::String(s) => parse_scalar_expr(s, file),
        serde_yaml::Value::Sequence(items) => {
            Expr::Sequence(items.iter().map(|i| to_expr(i, file)).collect())
        }
        serde_yaml::Value::Mapping(m) => {
            if let Some(secret) = single_secret_entry(m) {
                return Expr::Secret(Box::new(to_expr(secret, file)));
            }
            Expr::Mapping(
                m.iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), to_expr(v, file))))
                    .collect(),
            )
        }
        serde_yaml::Value::Tagged(t) => to_expr(&t.value, file),
    }
}

fn single_secret_entry(m: &serde_yaml::Mapping) -> Option<&serde_yaml::Value> {
    if m.len() != 1 {
        return None;
    }
    m.get(SECRET_KEY)
}

fn parse_scalar_string(s: &str, file: &str) -> Value {
    match parse_reference(s, file) {
        Some(r) => Value::Reference(r),
        None => Value::String(s.to_string()),
    }
}

fn parse_scalar_expr(s: &str, file: &str) -> Expr {
    match parse_reference(s, file) {
        Some(r) => Expr::ReferenceExpr {
            alias: r.alias,
            path: r.path,
            span: r.span,
        },
        None => Expr::StringLiteral(s.to_string()),
    }
}

fn parse_reference(s: &str, file: &str) -> Option<nomos_core::Reference> {
    let rest = s.strip_prefix('@')?;
    let (alias, path) = rest.split_once(':')?;
    if alias.is_empty() || path.is_empty() {
        return None;
    }
    Some(nomos_core::Reference {
        alias: alias.to_string(),
        path: nomos_core::Path::new(path.split('.').map(str::to_string)),
        span: SourceSpan {
            file: file.to_string(),
            line: 0,
            col: 0,
        },
    })
}

/// Replace every `${name}` occurrence with `vars[name]`'s string form,
/// left untouched when `name` is absent.
fn substitute_vars(text: &str, vars: &BTreeMap<String, Value>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + end];
        match vars.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_json().to_string()),
            None => out.push_str(&rest[start..start + end + 1]),
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}
