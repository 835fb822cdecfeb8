//! Embedded templates with named placeholders.
//!
//! A template is a text document containing `<PLACEHOLDER>` markers: an
//! upper-case ASCII letter followed by at least two upper-case letters, digits
//! or underscores, between angle brackets. Markers are collected from the
//! template text once; filling an unknown marker or rendering with a marker
//! left unfilled is an error.

use crate::error::CodegenError;
use std::collections::BTreeMap;

/// A named template document.
#[derive(Debug, Clone)]
pub struct Template {
    name: &'static str,
    text: &'static str,
    markers: Vec<String>,
    values: BTreeMap<String, String>,
}

impl Template {
    /// Wraps template text and collects its markers.
    #[must_use]
    pub fn new(name: &'static str, text: &'static str) -> Self {
        Self {
            name,
            text,
            markers: find_markers(text),
            values: BTreeMap::new(),
        }
    }

    /// Returns the placeholder names found in the template, in order of
    /// first appearance.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Fills a placeholder.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the template has no such marker.
    pub fn fill(&mut self, marker: &str, value: impl Into<String>) -> Result<&mut Self, CodegenError> {
        if !self.markers.iter().any(|m| m == marker) {
            return Err(CodegenError::template(
                self.name,
                format!("unknown placeholder <{marker}>"),
            ));
        }
        self.values.insert(marker.to_string(), value.into());
        Ok(self)
    }

    /// Renders the template.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` naming the first unfilled marker.
    pub fn render(&self) -> Result<String, CodegenError> {
        let mut output = self.text.to_string();
        for marker in &self.markers {
            let value = self.values.get(marker).ok_or_else(|| {
                CodegenError::template(self.name, format!("placeholder <{marker}> was not filled"))
            })?;
            output = output.replace(&format!("<{marker}>"), value);
        }
        Ok(output)
    }
}

fn find_markers(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut markers: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_uppercase()
                    || bytes[end].is_ascii_digit()
                    || bytes[end] == b'_')
            {
                end += 1;
            }
            let is_marker = end < bytes.len()
                && bytes[end] == b'>'
                && end - start >= 3
                && bytes[start].is_ascii_uppercase();
            if is_marker {
                let name = &text[start..end];
                if !markers.iter().any(|m| m == name) {
                    markers.push(name.to_string());
                }
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_found() {
        let t = Template::new("t", "a <ONE> b <TWO_2> <ONE> Vec<ObjRef> <T> <ab>");
        assert_eq!(t.markers(), &["ONE".to_string(), "TWO_2".to_string()]);
    }

    #[test]
    fn test_fill_and_render() {
        let mut t = Template::new("t", "x=<VALUE>; y=<VALUE>; z=<OTHER>");
        t.fill("VALUE", "1").unwrap().fill("OTHER", "2").unwrap();
        assert_eq!(t.render().unwrap(), "x=1; y=1; z=2");
    }

    #[test]
    fn test_unknown_placeholder() {
        let mut t = Template::new("t", "<VALUE>");
        assert!(matches!(
            t.fill("MISSING", "1"),
            Err(CodegenError::Template { .. })
        ));
    }

    #[test]
    fn test_unfilled_placeholder() {
        let mut t = Template::new("t", "<VALUE> <OTHER>");
        t.fill("VALUE", "1").unwrap();
        let err = t.render().unwrap_err();
        assert!(err.to_string().contains("<OTHER>"));
    }
}
