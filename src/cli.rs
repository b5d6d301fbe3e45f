use clap::Parser;
use std::path::{Path, PathBuf};

/// Translate, combine and clean up exported visual-novel scripts.
///
/// Without a mode an interactive menu is shown; without a game, a game chooser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Game profile to work on
    pub game: Option<String>,

    /// A file relative to the export directory, `all`, `combine` or `strip`
    pub mode: Option<String>,

    /// For `combine` and `strip`: a relative file or `all`
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    File(PathBuf),
}

impl Target {
    fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("all") => Self::All,
            Some(file) => Self::File(PathBuf::from(file)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Translate(Target),
    Combine(Target),
    Strip(Target),
}

impl Args {
    /// The action selected on the command line, `None` when the menu should decide
    pub fn action(&self) -> Option<Action> {
        let mode = self.mode.as_deref()?;
        let target = self.target.as_deref();

        Some(match mode {
            "all" => Action::Translate(Target::All),
            "combine" => Action::Combine(Target::parse(target)),
            "strip" => Action::Strip(Target::parse(target)),
            file => Action::Translate(Target::File(PathBuf::from(file))),
        })
    }
}

/// Entries of the interactive menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    TranslateFile,
    TranslateAll,
    CombineFile,
    CombineAll,
    StripAll,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 5] = [
        Self::TranslateFile,
        Self::TranslateAll,
        Self::CombineFile,
        Self::CombineAll,
        Self::StripAll,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        let index: usize = input.trim().parse().ok()?;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TranslateFile => "Process a single file",
            Self::TranslateAll => "Process all files",
            Self::CombineFile => "Combine original+translated (single file)",
            Self::CombineAll => "Combine all original+translated",
            Self::StripAll => "Strip speaker notes from all translated files",
        }
    }

    pub fn needs_file(&self) -> bool {
        matches!(self, Self::TranslateFile | Self::CombineFile)
    }

    pub fn into_action(self, file: Option<PathBuf>) -> Action {
        let target = file.map(Target::File).unwrap_or(Target::All);
        match self {
            Self::TranslateFile | Self::TranslateAll => Action::Translate(target),
            Self::CombineFile | Self::CombineAll => Action::Combine(target),
            Self::StripAll => Action::Strip(target),
        }
    }
}

/// Pick a file from `files` by its 1-based number or by its exact relative path
pub fn resolve_file_choice(input: &str, files: &[PathBuf]) -> Option<PathBuf> {
    let input = input.trim();
    if let Ok(number) = input.parse::<usize>() {
        return files.get(number.checked_sub(1)?).cloned();
    }

    let wanted = Path::new(input);
    files.iter().find(|file| file.as_path() == wanted).cloned()
}
