//! Optional `rivet.toml` read from the document's directory.

use std::path::Path;

use calc::format::MAX_DECIMALS;
use calc::{Context, Folders};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "rivet.toml";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub folders: FolderConfig,
    pub format: FormatConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    /// Report number used in report-level labels.
    pub report: Option<u32>,
    /// Section width in characters.
    pub width: Option<usize>,
}

/// Folder paths, relative to the document's directory.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FolderConfig {
    pub text: Option<String>,
    pub tables: Option<String>,
    pub figures: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatConfig {
    pub e: Option<usize>,
    pub r: Option<usize>,
    pub p: Option<u8>,
    pub trim: Option<bool>,
    pub text_width: Option<usize>,
    pub table_width: Option<usize>,
    pub scale: Option<u32>,
}

impl Config {
    /// Load `rivet.toml` from `dir`; a missing file gives the defaults.
    pub fn load(dir: &Path) -> Result<Config, String> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Config::parse(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> Result<Config, String> {
        toml::from_str(text).map_err(|e| format!("TOML parse error: {}", e))
    }

    /// Build the starting context for a document in `dir`.
    pub fn context(&self, dir: &Path) -> Context {
        let folder = |name: &Option<String>| match name {
            Some(name) => dir.join(name),
            None => dir.to_path_buf(),
        };
        let mut ctx = Context::new().with_folders(Folders {
            text: folder(&self.folders.text),
            tables: folder(&self.folders.tables),
            figures: folder(&self.folders.figures),
        });

        if let Some(report) = self.document.report {
            ctx.state.report_number = report;
        }
        if let Some(width) = self.document.width {
            ctx.state.section_width = width;
        }

        let f = &self.format;
        let s = &mut ctx.settings;
        if let Some(e) = f.e {
            s.equation_decimals = e.min(MAX_DECIMALS);
        }
        if let Some(r) = f.r {
            s.result_decimals = r.min(MAX_DECIMALS);
        }
        if let Some(p) = f.p {
            s.print_mode = p.min(2);
        }
        if let Some(trim) = f.trim {
            s.trim = trim;
        }
        if let Some(w) = f.text_width {
            s.text_width = w;
        }
        if let Some(w) = f.table_width {
            s.table_width = w;
        }
        if let Some(scale) = f.scale {
            s.scale = scale;
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_keeps_defaults() {
        let ctx = Config::parse("").unwrap().context(Path::new("proj"));
        assert_eq!(ctx.state.section_width, 80);
        assert_eq!(ctx.settings.result_decimals, 3);
        assert_eq!(ctx.folders.tables, Path::new("proj"));
    }

    #[test]
    fn sections_override_context() {
        let config = Config::parse(
            "[document]\nreport = 4\nwidth = 60\n\n[folders]\ntables = \"data\"\n\n[format]\ne = 99\nr = 2\np = 9\ntrim = true\n",
        )
        .unwrap();
        let ctx = config.context(Path::new("proj"));
        assert_eq!(ctx.state.report_number, 4);
        assert_eq!(ctx.state.section_width, 60);
        assert_eq!(ctx.folders.tables, Path::new("proj").join("data"));
        assert_eq!(ctx.folders.figures, Path::new("proj"));
        assert_eq!(ctx.settings.result_decimals, 2);
        assert_eq!(ctx.settings.equation_decimals, MAX_DECIMALS);
        assert_eq!(ctx.settings.print_mode, 2);
        assert!(ctx.settings.trim);
    }

    #[test]
    fn unknown_types_are_errors() {
        assert!(Config::parse("[document]\nwidth = \"wide\"\n").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }
}
