//! Identifier derivation.
//!
//! [`NamingEngine`] turns raw schema names (`io_decl`, `table_entry`) into the
//! spellings used by every emitter: Pascal-case class and accessor names,
//! lower-camel member names for the wire schema, and snake-case Rust
//! identifiers. Each conversion normalizes first, then consults a finite
//! override table for irregular merges and plurals.
//!
//! All conversions are pure. Results are memoized behind a read-write lock so
//! one engine can be shared by emitters running on different threads.

use crate::types::Cardinality;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Rust keywords that are accepted as raw identifiers.
const RAW_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers and get a trailing underscore.
const RESERVED_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

const HDL_CLASS_OVERRIDES: &[(&str, &str)] = &[
    ("AliasStmt", "Alias"),
    ("AssertStmt", "Assert"),
    ("ClockingIoDecl", "ClockingIODecl"),
    ("InterfaceInst", "Interface"),
    ("InterfaceTfDecl", "InterfaceTFDecl"),
    ("IoDecl", "IODecl"),
    ("ProcessStmt", "Process"),
    ("TfCall", "TFCall"),
    ("ThreadObj", "Thread"),
];

const HDL_MEMBER_OVERRIDES: &[(&str, &str)] = &[
    ("AliasStmt", "Alias"),
    ("AliasStmts", "Aliases"),
    ("AssertStmt", "Assert"),
    ("AssertStmts", "Asserts"),
    ("Childrens", "Children"),
    ("ClockingIoDecl", "ClockingIODecl"),
    ("ClockingIoDecls", "ClockingIODecls"),
    ("InterfaceTfDecl", "InterfaceTFDecl"),
    ("InterfaceTfDecls", "InterfaceTFDecls"),
    ("IoDecl", "IODecl"),
    ("IoDecls", "IODecls"),
    ("ProcessStmt", "Process"),
    ("ProcessStmts", "Processes"),
    ("TableEntrys", "TableEntries"),
    ("TfCallArgs", "TFCallArgs"),
    ("ThreadObj", "Thread"),
    ("Indexs", "Indexes"),
    ("DpiPure", "DPIPure"),
    ("DpiContext", "DPIContext"),
    ("DpiCstr", "DPICStr"),
    ("DpiCIdentifier", "DPICIdentifier"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Style {
    Class,
    Accessor,
    Member,
}

/// Deterministic identifier derivation with override tables.
#[derive(Debug)]
pub struct NamingEngine {
    class_overrides: HashMap<String, String>,
    accessor_overrides: HashMap<String, String>,
    member_overrides: HashMap<String, String>,
    cache: RwLock<HashMap<(Style, String, Cardinality), String>>,
}

impl Default for NamingEngine {
    fn default() -> Self {
        Self::hdl()
    }
}

impl Clone for NamingEngine {
    fn clone(&self) -> Self {
        Self {
            class_overrides: self.class_overrides.clone(),
            accessor_overrides: self.accessor_overrides.clone(),
            member_overrides: self.member_overrides.clone(),
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl NamingEngine {
    /// Creates an engine carrying the hardware object model's override tables.
    #[must_use]
    pub fn hdl() -> Self {
        let mut builder = NamingEngineBuilder::new();
        for (from, to) in HDL_CLASS_OVERRIDES {
            builder = builder.class_override(*from, *to);
        }
        for (from, to) in HDL_MEMBER_OVERRIDES {
            builder = builder.accessor_override(*from, *to);
            // The wire schema spells call sites `tfCall`.
            if *from != "TfCall" {
                builder = builder.member_override(*from, *to);
            }
        }
        builder.accessor_override("TfCall", "TFCall").build()
    }

    /// Creates an engine with no overrides.
    #[must_use]
    pub fn plain() -> Self {
        NamingEngineBuilder::new().build()
    }

    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> NamingEngineBuilder {
        NamingEngineBuilder::new()
    }

    /// Pascalizes `raw`: the letter after each underscore is upper-cased and
    /// underscores are dropped.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        normalize(raw)
    }

    /// Derives the class name of an entity (`cont_assign` → `ContAssign`).
    #[must_use]
    pub fn class_name(&self, raw: &str) -> String {
        self.cached(Style::Class, raw, Cardinality::One, |engine| {
            let name = normalize(raw);
            lookup(&engine.class_overrides, name)
        })
    }

    /// Derives the Pascal-case accessor name of a member.
    #[must_use]
    pub fn accessor_name(&self, raw: &str, cardinality: Cardinality) -> String {
        self.cached(Style::Accessor, raw, cardinality, |engine| {
            pluralized(&engine.accessor_overrides, raw, cardinality)
        })
    }

    /// Derives the lower-camel member name used by the wire schema.
    #[must_use]
    pub fn member_name(&self, raw: &str, cardinality: Cardinality) -> String {
        self.cached(Style::Member, raw, cardinality, |engine| {
            lower_first(&pluralized(&engine.member_overrides, raw, cardinality))
        })
    }

    /// Converts a Pascal-case name to snake case (`IODecl` → `io_decl`).
    #[must_use]
    pub fn snake_case(&self, pascal: &str) -> String {
        snake_case(pascal)
    }

    /// Rust field or method identifier for a member, keyword-escaped.
    #[must_use]
    pub fn field_ident(&self, raw: &str, cardinality: Cardinality) -> String {
        escape_ident(&self.fn_stem(raw, cardinality))
    }

    /// Unescaped snake-case stem for composing method names (`set_<stem>`).
    #[must_use]
    pub fn fn_stem(&self, raw: &str, cardinality: Cardinality) -> String {
        snake_case(&self.accessor_name(raw, cardinality))
    }

    /// Snake-case stem of an entity's class name (`make_<stem>`).
    #[must_use]
    pub fn type_fn_stem(&self, raw: &str) -> String {
        snake_case(&self.class_name(raw))
    }

    /// Escapes a snake-case identifier that collides with a Rust keyword.
    #[must_use]
    pub fn escape(&self, ident: &str) -> String {
        escape_ident(ident)
    }

    fn cached(
        &self,
        style: Style,
        raw: &str,
        cardinality: Cardinality,
        derive: impl FnOnce(&Self) -> String,
    ) -> String {
        let key = (style, raw.to_string(), cardinality);
        if let Some(hit) = self.cache.read().get(&key) {
            return hit.clone();
        }
        let value = derive(self);
        self.cache.write().insert(key, value.clone());
        value
    }
}

/// Builder for [`NamingEngine`] override tables.
#[derive(Debug, Default)]
pub struct NamingEngineBuilder {
    class_overrides: HashMap<String, String>,
    accessor_overrides: HashMap<String, String>,
    member_overrides: HashMap<String, String>,
}

impl NamingEngineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides a normalized class name.
    #[must_use]
    pub fn class_override(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.class_overrides.insert(from.into(), to.into());
        self
    }

    /// Overrides a normalized (optionally pluralized) accessor name.
    #[must_use]
    pub fn accessor_override(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.accessor_overrides.insert(from.into(), to.into());
        self
    }

    /// Overrides a normalized member name before its first letter is lowered.
    #[must_use]
    pub fn member_override(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.member_overrides.insert(from.into(), to.into());
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> NamingEngine {
        NamingEngine {
            class_overrides: self.class_overrides,
            accessor_overrides: self.accessor_overrides,
            member_overrides: self.member_overrides,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut upper = true;
    for ch in raw.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn lookup(table: &HashMap<String, String>, name: String) -> String {
    match table.get(&name) {
        Some(replacement) => replacement.clone(),
        None => name,
    }
}

fn pluralized(table: &HashMap<String, String>, raw: &str, cardinality: Cardinality) -> String {
    let mut name = lookup(table, normalize(raw));
    if cardinality == Cardinality::Many && !name.ends_with('s') {
        name.push('s');
    }
    lookup(table, name)
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snake_case(pascal: &str) -> String {
    let chars: Vec<char> = pascal.chars().collect();
    let mut out = String::with_capacity(pascal.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|c| c.is_ascii_lowercase());
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower)
                {
                    out.push('_');
                }
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn escape_ident(ident: &str) -> String {
    if RESERVED_KEYWORDS.contains(&ident) {
        format!("{ident}_")
    } else if RAW_KEYWORDS.contains(&ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let engine = NamingEngine::plain();
        assert_eq!(engine.normalize("cont_assign"), "ContAssign");
        assert_eq!(engine.normalize("_leading"), "Leading");
        assert_eq!(engine.normalize("a__b"), "AB");
        assert_eq!(engine.normalize("derived"), "Derived");
    }

    #[test]
    fn test_class_name_overrides() {
        let engine = NamingEngine::hdl();
        assert_eq!(engine.class_name("derived"), "Derived");
        assert_eq!(engine.class_name("io_decl"), "IODecl");
        assert_eq!(engine.class_name("tf_call"), "TFCall");
        assert_eq!(engine.class_name("thread_obj"), "Thread");
        assert_eq!(engine.class_name("module_inst"), "ModuleInst");
    }

    #[test]
    fn test_accessor_name_plurals() {
        let engine = NamingEngine::hdl();
        assert_eq!(engine.accessor_name("children", Cardinality::Many), "Children");
        assert_eq!(engine.accessor_name("table_entry", Cardinality::Many), "TableEntries");
        assert_eq!(engine.accessor_name("process_stmts", Cardinality::Many), "Processes");
        assert_eq!(engine.accessor_name("process_stmt", Cardinality::One), "Process");
        assert_eq!(engine.accessor_name("index", Cardinality::Many), "Indexes");
        assert_eq!(engine.accessor_name("net", Cardinality::Many), "Nets");
        assert_eq!(engine.accessor_name("net", Cardinality::One), "Net");
        assert_eq!(engine.accessor_name("tf_call", Cardinality::One), "TFCall");
    }

    #[test]
    fn test_member_name_lower_camel() {
        let engine = NamingEngine::hdl();
        assert_eq!(engine.member_name("io_decl", Cardinality::Many), "iODecls");
        assert_eq!(engine.member_name("table_entry", Cardinality::Many), "tableEntries");
        assert_eq!(engine.member_name("tf_call", Cardinality::One), "tfCall");
        assert_eq!(engine.member_name("start_line", Cardinality::One), "startLine");
    }

    #[test]
    fn test_rust_spellings() {
        let engine = NamingEngine::hdl();
        assert_eq!(engine.snake_case("IODecl"), "io_decl");
        assert_eq!(engine.snake_case("TFCallArgs"), "tf_call_args");
        assert_eq!(engine.snake_case("DPICStr"), "dpic_str");
        assert_eq!(engine.snake_case("Net2"), "net2");
        assert_eq!(engine.field_ident("type", Cardinality::One), "r#type");
        assert_eq!(engine.field_ident("self", Cardinality::One), "self_");
        assert_eq!(engine.fn_stem("type", Cardinality::One), "type");
        assert_eq!(engine.field_ident("io_decl", Cardinality::Many), "io_decls");
        assert_eq!(engine.type_fn_stem("tf_call"), "tf_call");
    }

    #[test]
    fn test_deterministic_and_cached() {
        let engine = NamingEngine::hdl();
        let first = engine.accessor_name("process_stmt", Cardinality::Many);
        let second = engine.accessor_name("process_stmt", Cardinality::Many);
        assert_eq!(first, second);
        let cloned = engine.clone();
        assert_eq!(cloned.accessor_name("process_stmt", Cardinality::Many), first);
    }

    #[test]
    fn test_custom_overrides() {
        let engine = NamingEngine::builder()
            .class_override("Foo", "FooBar")
            .accessor_override("Mouses", "Mice")
            .member_override("Mouses", "Mice")
            .build();
        assert_eq!(engine.class_name("foo"), "FooBar");
        assert_eq!(engine.accessor_name("mouse", Cardinality::Many), "Mice");
        assert_eq!(engine.member_name("mouse", Cardinality::Many), "mice");
    }
}
