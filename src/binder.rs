//! Checks the untyped entries of each [`Context`] against the schema and
//! stores them into a [`BoundRecord`].
//!
//! Keys are looked up by exact match. Keys the schema does not know are left
//! for the strict-mode check in [`validate`](crate::validate); the binder only
//! sees what it can type.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::ConfigError;
use crate::schema::{BoundRecord, FieldKind, SCHEMA, SchemaField, Scope, Setter};
use crate::tree::Context;
use crate::value::{Entry, Value};

pub struct Binder<'s> {
    schema: &'s [SchemaField],
    touched: BTreeSet<String>,
    deprecated_keys: Vec<String>,
}

impl Default for Binder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder<'static> {
    pub fn new() -> Self {
        Self::with_schema(SCHEMA)
    }
}

fn type_error(entry: &Entry, kind: FieldKind, found: impl Into<String>) -> ConfigError {
    ConfigError::Type {
        key: entry.key.clone(),
        line: entry.line,
        found: found.into(),
        expected: kind.expected(),
        example: kind.example(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string \"{s}\""),
        Value::Integer(digits) => format!("integer {digits}"),
        Value::Array(_) => "array".to_string(),
    }
}

fn string_list(entry: &Entry, kind: FieldKind) -> Result<Vec<String>, ConfigError> {
    let Value::Array(items) = &entry.value else {
        return Err(type_error(entry, kind, describe(&entry.value)));
    };
    items
        .iter()
        .map(|item| match &item.value {
            Value::String(s) => Ok(s.clone()),
            other => Err(type_error(
                entry,
                kind,
                format!("array with {} element", other.shape()),
            )),
        })
        .collect()
}

fn string_table(entry: &Entry, kind: FieldKind) -> Result<IndexMap<String, String>, ConfigError> {
    let Value::Array(items) = &entry.value else {
        return Err(type_error(entry, kind, describe(&entry.value)));
    };
    let mut table = IndexMap::with_capacity(items.len());
    for item in items {
        let (Some(key), Value::String(value)) = (&item.key, &item.value) else {
            let found = match &item.key {
                None => "array element without key".to_string(),
                Some(_) => format!("array with {} element", item.value.shape()),
            };
            return Err(type_error(entry, kind, found));
        };
        table.insert(key.clone(), value.clone());
    }
    Ok(table)
}

impl<'s> Binder<'s> {
    pub fn with_schema(schema: &'s [SchemaField]) -> Self {
        Self {
            schema,
            touched: BTreeSet::new(),
            deprecated_keys: Vec::new(),
        }
    }

    /// Bind the unconditional block. Every schema key it assigns is recorded
    /// in the touched set, even if its value then fails to bind.
    pub fn bind_global(&mut self, context: &Context) -> Result<BoundRecord, ConfigError> {
        for field in self.schema {
            if context.get(field.key).is_some() {
                self.touched.insert(field.key.to_string());
            }
        }
        self.bind_fields(context, true)
    }

    /// Bind a conditional block.
    pub fn bind(&mut self, context: &Context) -> Result<BoundRecord, ConfigError> {
        self.bind_fields(context, false)
    }

    fn bind_fields(&mut self, context: &Context, global: bool) -> Result<BoundRecord, ConfigError> {
        let mut record = BoundRecord::default();
        for field in self.schema {
            let Some(entry) = context.get(field.key) else {
                continue;
            };
            if !global && field.scope == Some(Scope::Server) {
                tracing::warn!(
                    key = field.key,
                    line = entry.line,
                    context = %context.name,
                    "server-wide option has no effect inside a conditional block"
                );
            }

            let kind = field.kind();
            match field.setter {
                Setter::String(set) => match &entry.value {
                    Value::String(s) => set(&mut record, s.clone()),
                    other => return Err(type_error(entry, kind, describe(other))),
                },
                Setter::List(set) => set(&mut record, string_list(entry, kind)?),
                Setter::Table(set) => set(&mut record, string_table(entry, kind)?),
                Setter::UnsignedInt(set) => {
                    let parsed = match &entry.value {
                        Value::Integer(digits) => digits.parse::<u16>().ok(),
                        _ => None,
                    };
                    match parsed {
                        Some(n) => set(&mut record, n),
                        None => return Err(type_error(entry, kind, describe(&entry.value))),
                    }
                }
                Setter::Bool(set) => match entry.value.as_str() {
                    Some("enable") => set(&mut record, true),
                    Some("disable") => set(&mut record, false),
                    _ => return Err(type_error(entry, kind, describe(&entry.value))),
                },
                Setter::Deprecated(replacement) => {
                    tracing::warn!(
                        key = field.key,
                        line = entry.line,
                        replacement,
                        "found deprecated key"
                    );
                    self.deprecated_keys.push(field.key.to_string());
                }
                Setter::Ignored => {}
            }
        }
        Ok(record)
    }

    /// Keys assigned in the unconditional block.
    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    /// Deprecated keys seen so far, in binding order.
    pub fn deprecated_keys(&self) -> &[String] {
        &self.deprecated_keys
    }

    pub fn into_parts(self) -> (BTreeSet<String>, Vec<String>) {
        (self.touched, self.deprecated_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    fn global(input: &str) -> Context {
        parse(input.as_bytes()).unwrap().remove(0)
    }

    fn bind_global(input: &str) -> Result<BoundRecord, ConfigError> {
        Binder::new().bind_global(&global(input))
    }

    fn type_err(input: &str) -> (String, String, usize) {
        match bind_global(input).unwrap_err() {
            ConfigError::Type {
                key, found, line, ..
            } => (key, found, line),
            other => panic!("Expected Type, got: {other:?}"),
        }
    }

    #[test]
    fn binds_each_kind() {
        let record = bind_global(
            "server.document-root = \"/srv/www\"\n\
             server.port = 8080\n\
             server.dir-listing = \"enable\"\n\
             server.follow-symlink = \"disable\"\n\
             server.indexfiles = ( \"index.html\", \"index.htm\" )\n\
             mimetype.assign = ( \".html\" => \"text/html\", \".css\" => \"text/css\" )\n",
        )
        .unwrap();
        assert_eq!(record.document_root.as_deref(), Some("/srv/www"));
        assert_eq!(record.port, Some(8080));
        assert_eq!(record.dir_listing, Some(true));
        assert_eq!(record.follow_symlink, Some(false));
        assert_eq!(
            record.indexfiles,
            Some(vec!["index.html".to_string(), "index.htm".to_string()])
        );
        let mimetypes = record.mimetypes.unwrap();
        assert_eq!(mimetypes.get(".css").map(String::as_str), Some("text/css"));
        assert_eq!(mimetypes.get_index(0).unwrap().0, ".html");
    }

    #[test]
    fn absent_fields_stay_none() {
        let record = bind_global("server.tag = \"x\"\n").unwrap();
        assert_eq!(record.server_tag.as_deref(), Some("x"));
        assert_eq!(
            record,
            BoundRecord {
                server_tag: Some("x".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn list_discards_element_keys() {
        let record = bind_global("server.modules = ( \"a\" => \"mod_access\", \"mod_cgi\" )\n").unwrap();
        assert_eq!(
            record.modules,
            Some(vec!["mod_access".to_string(), "mod_cgi".to_string()])
        );
    }

    #[test]
    fn table_later_duplicates_replace() {
        let record = bind_global(
            "mimetype.assign = ( \".a\" => \"one\", \".b\" => \"two\", \".a\" => \"three\" )\n",
        )
        .unwrap();
        let table = record.mimetypes.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_index(0).unwrap(), (&".a".to_string(), &"three".to_string()));
    }

    #[test]
    fn array_for_string_field_fails() {
        let (key, found, line) = type_err("\nserver.document-root = ( \"/a\" )\n");
        assert_eq!(key, "server.document-root");
        assert_eq!(found, "array");
        assert_eq!(line, 2);
    }

    #[test]
    fn non_string_array_element_fails() {
        let (key, found, _) = type_err("server.indexfiles = ( \"index.html\", 5 )\n");
        assert_eq!(key, "server.indexfiles");
        assert!(found.contains("integer"));
    }

    #[test]
    fn nested_array_element_fails() {
        let (key, _, _) = type_err("server.modules = ( ( \"x\" ) )\n");
        assert_eq!(key, "server.modules");
    }

    #[test]
    fn table_requires_keys() {
        let (key, found, _) = type_err("mimetype.assign = ( \"text/html\" )\n");
        assert_eq!(key, "mimetype.assign");
        assert!(found.contains("without key"));
    }

    #[test]
    fn integer_out_of_range_fails() {
        let (key, found, _) = type_err("server.port = 65536\n");
        assert_eq!(key, "server.port");
        assert!(found.contains("65536"));
        assert!(bind_global("server.port = 65535\n").is_ok());
    }

    #[test]
    fn quoted_number_is_not_an_integer() {
        let (key, _, _) = type_err("server.port = \"80\"\n");
        assert_eq!(key, "server.port");
    }

    #[test]
    fn bool_accepts_only_enable_disable() {
        let (key, found, _) = type_err("ssl.engine = \"yes\"\n");
        assert_eq!(key, "ssl.engine");
        assert!(found.contains("yes"));
        assert!(matches!(
            bind_global("ssl.engine = 1\n").unwrap_err(),
            ConfigError::Type { .. }
        ));
    }

    #[test]
    fn type_error_message_has_example() {
        let err = bind_global("server.use-ipv6 = \"on\"\n").unwrap_err();
        assert!(err.to_string().contains("(enable|disable)"));
    }

    #[test]
    fn deprecated_only_config() {
        let mut binder = Binder::new();
        let record = binder
            .bind_global(&global("server.docroot = \"/srv\"\n"))
            .unwrap();
        assert_eq!(record, BoundRecord::default());
        assert_eq!(binder.deprecated_keys(), ["server.docroot"]);
    }

    #[test]
    fn touched_set_tracks_global_only() {
        let contexts = parse(
            b"server.tag = \"a\"\nunknown.key = \"b\"\n$HTTPhost == \"x\" {\nserver.name = \"x\"\n}\n",
        )
        .unwrap();
        let mut binder = Binder::new();
        binder.bind_global(&contexts[0]).unwrap();
        binder.bind(&contexts[1]).unwrap();
        let touched: Vec<_> = binder.touched().iter().map(String::as_str).collect();
        assert_eq!(touched, vec!["server.tag"]);
    }

    #[test]
    fn touched_before_type_check() {
        let mut binder = Binder::new();
        assert!(binder.bind_global(&global("server.port = \"x\"\n")).is_err());
        assert!(binder.touched().contains("server.port"));
    }

    #[test]
    fn touched_includes_keys_after_failing_one() {
        let mut binder = Binder::new();
        let result = binder.bind_global(&global("server.bind = 1\nserver.tag = \"x\"\n"));
        assert!(matches!(result, Err(ConfigError::Type { ref key, .. }) if key == "server.bind"));
        let touched: Vec<_> = binder.touched().iter().map(String::as_str).collect();
        assert_eq!(touched, vec!["server.bind", "server.tag"]);
    }

    #[test]
    fn ignored_fields_bind_nothing() {
        let schema = [SchemaField {
            key: "module.option",
            scope: None,
            setter: Setter::Ignored,
        }];
        let mut binder = Binder::with_schema(&schema);
        let record = binder.bind_global(&global("module.option = ( 1, 2 )\n")).unwrap();
        assert_eq!(record, BoundRecord::default());
        assert!(binder.touched().contains("module.option"));
    }

    #[test]
    fn server_scope_key_in_block_still_binds() {
        let contexts = parse(b"$HTTPhost == \"x\" {\nserver.port = 81\n}\n").unwrap();
        let record = Binder::new().bind(&contexts[1]).unwrap();
        assert_eq!(record.port, Some(81));
    }
}
