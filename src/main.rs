//! resume-parser: structured candidate profiles from PDF and DOCX resumes

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use resume_parser::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use resume_parser::config::{Config, ModelType, OutputFormat};
use resume_parser::error::{Result, ResumeParserError};
use resume_parser::models::ModelManager;
use resume_parser::output::formatter_for;
use resume_parser::pipeline::{self, ResumeExtractor};
use resume_parser::profile::ResumeProfile;
use std::path::{Path, PathBuf};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, mut config: Config, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Parse {
            path,
            strategy,
            output,
            save,
            skills,
        } => {
            if let Some(strategy) = strategy {
                config.extraction.strategy =
                    cli::parse_strategy(&strategy).map_err(ResumeParserError::InvalidInput)?;
            }
            if let Some(output) = output {
                config.output.format =
                    cli::parse_output_format(&output).map_err(ResumeParserError::InvalidInput)?;
            }
            if skills.is_some() {
                config.skills.vocabulary_path = skills;
            }

            info!("Initializing extraction context ({:?})", config.extraction.strategy);
            let context = pipeline::init_global(&config).await?;
            let extractor = context.extractor()?;

            let rendered = if path.is_dir() {
                parse_folder(&path, extractor.as_ref(), &config).await?
            } else {
                let profile = parse_file(&path, extractor.as_ref()).await?;
                render(&[profile], &config)?
            };

            match save {
                Some(target) => {
                    tokio::fs::write(&target, &rendered).await?;
                    info!("Saved output to {}", target.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Models { action } => {
            let manager = ModelManager::new(config.models_dir().clone()).await?;

            match action {
                ModelAction::List => {
                    for (model_type, label) in [
                        (ModelType::Embedding, "Embedding models"),
                        (ModelType::Ner, "NER models"),
                        (ModelType::LLM, "Generator models"),
                    ] {
                        println!("{}:", label);
                        for model in config.list_models(model_type) {
                            let status = if manager.is_downloaded(&model.repo_id).await {
                                "downloaded"
                            } else {
                                "available"
                            };
                            println!(
                                "  • {} ({}) - {} MB [{}]",
                                model.name, model.repo_id, model.size_mb, status
                            );
                            println!("    {}", model.description);
                        }
                        println!();
                    }
                }

                ModelAction::Download { model } => {
                    let repo_id = config
                        .get_model_by_name(&model)
                        .map(|m| m.repo_id.clone())
                        .unwrap_or(model);
                    let location = manager.download(&repo_id).await?;
                    println!("Model '{}' ready at {}", repo_id, location.display());
                }
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                print!("{}", config.to_toml()?);
            }

            Some(ConfigAction::Reset) => {
                let target = config_path.unwrap_or_else(Config::config_path);
                Config::default().save_to(&target)?;
                println!("Configuration reset: {}", target.display());
            }

            Some(ConfigAction::Path) => {
                println!("{}", config_path.unwrap_or_else(Config::config_path).display());
            }
        },
    }

    Ok(())
}

async fn parse_file(path: &Path, extractor: &dyn ResumeExtractor) -> Result<ResumeProfile> {
    if !path.exists() {
        return Err(ResumeParserError::InvalidInput(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    extractor.extract(&bytes, &filename).await
}

/// Parse every supported file in `dir`; failures are logged and skipped
async fn parse_folder(dir: &Path, extractor: &dyn ResumeExtractor, config: &Config) -> Result<String> {
    let files = cli::resume_files_in(dir)?;
    if files.is_empty() {
        warn!("No .pdf or .docx files in {}", dir.display());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| ResumeParserError::Configuration(format!("Invalid progress template: {}", e)))?
            .progress_chars("=>-"),
    );

    let mut profiles = Vec::with_capacity(files.len());
    let mut failures = 0;
    for file in &files {
        pb.set_message(file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
        match parse_file(file, extractor).await {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                failures += 1;
                pb.suspend(|| error!("{}: {}", file.display(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    info!("Parsed {} of {} files ({} failed)", profiles.len(), files.len(), failures);
    render(&profiles, config)
}

fn render(profiles: &[ResumeProfile], config: &Config) -> Result<String> {
    if config.output.format == OutputFormat::Json && profiles.len() != 1 {
        let wire: Vec<_> = profiles.iter().map(ResumeProfile::to_wire).collect();
        return Ok(if config.output.pretty_json {
            serde_json::to_string_pretty(&wire)?
        } else {
            serde_json::to_string(&wire)?
        });
    }

    let formatter = formatter_for(config.output.format, &config.output);
    let rendered = profiles
        .iter()
        .map(|profile| formatter.format_profile(profile))
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join("\n"))
}
