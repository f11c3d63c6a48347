use std::path::{Path, PathBuf};

use crate::environment::Environment;
use crate::format::FormatSettings;
use crate::plot::PlotSpec;
use crate::state::RunningState;
use crate::table::TableStore;

/// Directories that relative file names in commands resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct Folders {
    pub text: PathBuf,
    pub tables: PathBuf,
    pub figures: PathBuf,
}

impl Default for Folders {
    fn default() -> Self {
        Folders {
            text: PathBuf::from("."),
            tables: PathBuf::from("."),
            figures: PathBuf::from("."),
        }
    }
}

impl Folders {
    /// All three folders set to `dir`.
    pub fn all(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Folders {
            text: dir.clone(),
            tables: dir.clone(),
            figures: dir,
        }
    }

    pub fn text_path(&self, name: &str) -> PathBuf {
        resolve(&self.text, name)
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        resolve(&self.tables, name)
    }

    pub fn figure_path(&self, name: &str) -> PathBuf {
        resolve(&self.figures, name)
    }
}

fn resolve(folder: &Path, name: &str) -> PathBuf {
    let path = Path::new(name.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        folder.join(path)
    }
}

/// Everything threaded from one rivet string to the next.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub state: RunningState,
    pub env: Environment,
    pub settings: FormatSettings,
    pub folders: Folders,
    pub tables: TableStore,
    /// The figure being built by `plot`/`add` in table strings.
    pub plot: Option<PlotSpec>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folders(mut self, folders: Folders) -> Self {
        self.folders = folders;
        self
    }

    /// Width used for justification, rules and right-aligned results.
    pub fn width(&self) -> usize {
        self.state.section_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_resolve_in_their_folder() {
        let folders = Folders {
            text: PathBuf::from("txt"),
            tables: PathBuf::from("data"),
            figures: PathBuf::from("fig"),
        };
        assert_eq!(folders.table_path("loads.csv"), PathBuf::from("data/loads.csv"));
        assert_eq!(folders.figure_path(" beam.png "), PathBuf::from("fig/beam.png"));
        assert_eq!(folders.text_path("/abs/notes.txt"), PathBuf::from("/abs/notes.txt"));
    }
}
