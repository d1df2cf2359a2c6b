use crate::aggregate::Presentation;
use crate::error::OutputError;
use clap::ValueEnum;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain JSON document
    #[default]
    Json,
    /// JavaScript assignment (`var data = ...;`) for static viewers
    Js,
}

pub fn render(presentation: &Presentation, format: OutputFormat) -> Result<String, OutputError> {
    let json = serde_json::to_string_pretty(presentation)?;
    Ok(match format {
        OutputFormat::Json => json,
        OutputFormat::Js => format!("var data =\n{};\n", json),
    })
}

/// Write collected results, creating the parent directory if needed
pub fn write_presentation(
    path: &Path,
    presentation: &Presentation,
    format: OutputFormat,
) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(OutputError::CreateDir)?;
    }

    let content = render(presentation, format)?;
    fs::write(path, content).map_err(OutputError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_js_wraps_json() {
        let presentation = Presentation { groups: Vec::new() };

        let js = render(&presentation, OutputFormat::Js).unwrap();
        assert!(js.starts_with("var data =\n{"));
        assert!(js.trim_end().ends_with("};"));

        let json = render(&presentation, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "groups": [] }));
    }

    #[test]
    fn test_write_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site/data.js");

        write_presentation(&path, &Presentation { groups: Vec::new() }, OutputFormat::Js)
            .unwrap();

        assert!(fs::read_to_string(&path).unwrap().starts_with("var data ="));
    }
}
