use std::fmt;

use crate::StringKind;

/// How many lines a command block spans after its opening line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// Dispatched on the opening line alone.
    Single,
    /// Continuation lines up to the next blank line.
    UntilBlank,
    /// Exactly this many non-blank continuation lines.
    Fixed(usize),
}

/// Every command keyword across all string kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // repo
    Summary,
    Labels,
    Append,
    // insert
    Tex,
    Sym,
    Table,
    Image,
    Image2,
    Text,
    // value
    Values,
    // equation
    Format,
    Func,
    // table
    Read,
    Save,
    Data,
    Plot,
    Add,
}

const REPO_COMMANDS: &[Command] = &[Command::Summary, Command::Labels, Command::Append];

const INSERT_COMMANDS: &[Command] = &[
    Command::Tex,
    Command::Sym,
    Command::Table,
    Command::Image,
    Command::Image2,
    Command::Text,
];

const VALUE_COMMANDS: &[Command] = &[Command::Values];

const EQUATION_COMMANDS: &[Command] = &[Command::Format, Command::Func];

const TABLE_COMMANDS: &[Command] = &[
    Command::Read,
    Command::Save,
    Command::Data,
    Command::Table,
    Command::Plot,
    Command::Add,
    Command::Image,
    Command::Image2,
];

impl Command {
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Summary => "summary",
            Command::Labels => "labels",
            Command::Append => "append",
            Command::Tex => "tex",
            Command::Sym => "sym",
            Command::Table => "table",
            Command::Image => "image",
            Command::Image2 => "image2",
            Command::Text => "text",
            Command::Values => "values",
            Command::Format => "format",
            Command::Func => "func",
            Command::Read => "read",
            Command::Save => "save",
            Command::Data => "data",
            Command::Plot => "plot",
            Command::Add => "add",
        }
    }

    /// Block shape of this command. `table` accumulates a body in both the
    /// insert and table kinds (title line plus optional inline rows).
    pub fn shape(&self) -> BlockShape {
        match self {
            Command::Summary
            | Command::Labels
            | Command::Append
            | Command::Table
            | Command::Values => BlockShape::UntilBlank,
            Command::Image => BlockShape::Fixed(1),
            Command::Image2 => BlockShape::Fixed(2),
            Command::Tex
            | Command::Sym
            | Command::Text
            | Command::Format
            | Command::Func
            | Command::Read
            | Command::Save
            | Command::Data
            | Command::Plot
            | Command::Add => BlockShape::Single,
        }
    }

    /// The command vocabulary of a string kind.
    pub fn vocabulary(kind: StringKind) -> &'static [Command] {
        match kind {
            StringKind::Repo => REPO_COMMANDS,
            StringKind::Insert => INSERT_COMMANDS,
            StringKind::Value => VALUE_COMMANDS,
            StringKind::Equation => EQUATION_COMMANDS,
            StringKind::Table => TABLE_COMMANDS,
        }
    }

    /// Look up `keyword` in the vocabulary of `kind`. Matching is
    /// case-insensitive.
    pub fn lookup(kind: StringKind, keyword: &str) -> Option<Command> {
        let keyword = keyword.trim().to_ascii_lowercase();
        Self::vocabulary(kind)
            .iter()
            .copied()
            .find(|c| c.keyword() == keyword)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabularies_are_per_kind() {
        assert_eq!(Command::lookup(StringKind::Insert, "table"), Some(Command::Table));
        assert_eq!(Command::lookup(StringKind::Table, "TABLE"), Some(Command::Table));
        assert_eq!(Command::lookup(StringKind::Repo, "table"), None);
        assert_eq!(Command::lookup(StringKind::Value, "plot"), None);
    }

    #[test]
    fn image_blocks_have_fixed_length() {
        assert_eq!(Command::Image.shape(), BlockShape::Fixed(1));
        assert_eq!(Command::Image2.shape(), BlockShape::Fixed(2));
        assert_eq!(Command::Format.shape(), BlockShape::Single);
    }
}
