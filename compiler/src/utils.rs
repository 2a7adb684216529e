use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref RUST_KEYWORDS: HashSet<&'static str> = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn",
        "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
        "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
        "self", "Self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
        "final", "macro", "override", "priv", "try", "typeof", "unsized",
        "virtual", "yield",
    ]
    .into_iter()
    .collect();
    static ref INVALID_IDENT_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
}

/// A Rust string literal with every special character escaped.
pub fn string_literal(text: &str) -> String {
    format!("{:?}", text)
}

/// Replaces characters that cannot appear in a Rust identifier. A leading
/// digit gets an underscore in front.
pub fn sanitize(name: &str) -> String {
    let cleaned = INVALID_IDENT_CHARS.replace_all(name, "_").into_owned();
    match cleaned.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{}", cleaned),
        Some(_) => cleaned,
    }
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
pub fn escape_keyword(name: &str) -> String {
    if RUST_KEYWORDS.contains(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

fn with_case(name: &str, convert: fn(&str) -> String) -> String {
    let converted = convert(&sanitize(name));
    if converted.is_empty() {
        return "_".to_string();
    }
    // Case conversion may drop the guard underscore in front of a digit.
    escape_keyword(&sanitize(&converted))
}

pub fn type_ident(name: &str) -> String {
    with_case(name, |s| s.to_upper_camel_case())
}

pub fn field_ident(name: &str) -> String {
    with_case(name, |s| s.to_snake_case())
}

pub fn const_ident(name: &str) -> String {
    with_case(name, |s| s.to_shouty_snake_case())
}

/// `a.b.c` → `a::b::c`, each segment a snake_case identifier.
pub fn module_path(namespace: &str) -> String {
    namespace
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(field_ident)
        .collect::<Vec<_>>()
        .join("::")
}

/// Accumulates generated lines at a tracked indentation level.
#[derive(Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    level: usize,
}

impl CodeWriter {
    pub fn new() -> CodeWriter {
        CodeWriter::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.level), text));
        }
    }

    /// Writes `text` and indents what follows.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.level += 1;
    }

    /// Outdents and writes `text`.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.level = self.level.saturating_sub(1);
        self.line(text);
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_follow_rust_case() {
        assert_eq!(type_ident("user_profile"), "UserProfile");
        assert_eq!(type_ident("HTTPStatus"), "HttpStatus");
        assert_eq!(field_ident("sessionID"), "session_id");
        assert_eq!(field_ident("type"), "type_");
        assert_eq!(field_ident("Self"), "self_");
        assert_eq!(const_ident("maxRetries"), "MAX_RETRIES");
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize("a-b.c"), "a_b_c");
        assert_eq!(sanitize("9lives"), "_9lives");
        assert_eq!(sanitize(""), "_");
        assert_eq!(field_ident("2fa"), "_2fa");
    }

    #[test]
    fn module_paths() {
        assert_eq!(module_path("com.example.Shared"), "com::example::shared");
        assert_eq!(module_path("core"), "core");
    }

    #[test]
    fn code_writer_indents_blocks() {
        let mut code = CodeWriter::new();
        code.open("fn f() {");
        code.line("let x = 1;");
        code.line("");
        code.close("}");
        assert_eq!(code.finish(), "fn f() {\n    let x = 1;\n\n}\n");
    }

    #[test]
    fn string_literals_escape() {
        assert_eq!(string_literal("a\"b\n"), "\"a\\\"b\\n\"");
    }
}
