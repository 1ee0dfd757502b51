//! Command-line interface for the resume parser

use crate::config::{OutputFormat, Strategy};
use crate::input::file_detector::FileType;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "resume-parser")]
#[command(about = "Extract structured candidate profiles from PDF and DOCX resumes")]
#[command(long_about = "Parse resumes into structured profiles using section heuristics, skill matching and an optional local instruction model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a resume, or every resume in a folder
    Parse {
        /// Resume file (.pdf, .docx) or a directory of them
        path: PathBuf,

        /// Extraction strategy: rule-based, generative, auto
        #[arg(long)]
        strategy: Option<String>,

        /// Output format: console, json, markdown
        #[arg(short, long)]
        output: Option<String>,

        /// Save output to file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Skill vocabulary file (one term per line, or CSV)
        #[arg(long)]
        skills: Option<PathBuf>,
    },

    /// Model management commands
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show or reset configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List configured models and their download status
    List,

    /// Download a model
    Download {
        /// Model name or Hugging Face repo ID
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown",
            format
        )),
    }
}

pub fn parse_strategy(strategy: &str) -> Result<Strategy, String> {
    match strategy.to_lowercase().replace('_', "-").as_str() {
        "rule-based" | "rules" => Ok(Strategy::RuleBased),
        "generative" | "llm" => Ok(Strategy::Generative),
        "auto" => Ok(Strategy::Auto),
        _ => Err(format!(
            "Invalid strategy: {}. Supported: rule-based, generative, auto",
            strategy
        )),
    }
}

/// Supported resumes directly inside `dir`, sorted by name
pub fn resume_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| FileType::from_filename(name).is_supported())
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_output_format("MD"), Ok(OutputFormat::Markdown));
        assert!(parse_output_format("html").is_err());
        assert_eq!(parse_strategy("rule_based"), Ok(Strategy::RuleBased));
        assert_eq!(parse_strategy("Auto"), Ok(Strategy::Auto));
        assert!(parse_strategy("magic").is_err());
    }

    #[test]
    fn test_folder_listing_keeps_supported_files() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.docx", "a.PDF", "notes.txt", "old.doc"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names: Vec<String> = resume_files_in(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.docx"]);
    }

    #[test]
    fn test_cli_parses_parse_command() {
        let cli = Cli::try_parse_from(["resume-parser", "-v", "parse", "cv.pdf", "--strategy", "auto", "-o", "json"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Parse { path, strategy, output, .. } => {
                assert_eq!(path, PathBuf::from("cv.pdf"));
                assert_eq!(strategy.as_deref(), Some("auto"));
                assert_eq!(output.as_deref(), Some("json"));
            }
            _ => panic!("expected parse command"),
        }
    }
}
