//! Console, JSON and Markdown renderings of a profile

use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;
use crate::profile::{ExtractionSource, ResumeProfile};
use colored::{Color, Colorize};

pub trait OutputFormatter {
    fn format_profile(&self, profile: &ResumeProfile) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

pub fn formatter_for(format: OutputFormat, config: &OutputConfig) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(config.color_output)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.pretty_json)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new(true)),
    }
}

fn source_label(source: ExtractionSource) -> &'static str {
    match source {
        ExtractionSource::RuleBased => "rule-based",
        ExtractionSource::Generative => "generative",
        ExtractionSource::GenerativeChunked => "generative (chunked)",
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub struct ConsoleFormatter {
    use_colors: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, title: &str) -> String {
        if self.use_colors {
            format!("\n{} {}\n", "▓".color(Color::Green).bold(), title.color(Color::Green).bold())
        } else {
            format!("\n▓ {}\n", title)
        }
    }

    fn field(&self, label: &str, value: Option<&str>) -> String {
        format!("  {:<10} {}\n", self.colorize(label, Color::Cyan), or_dash(value))
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_profile(&self, profile: &ResumeProfile) -> Result<String> {
        let mut output = String::new();
        let metadata = profile.metadata();

        let title = format!("█ {}", profile.name().unwrap_or("Unknown candidate"));
        if self.use_colors {
            output.push_str(&format!("{}\n", title.color(Color::Blue).bold()));
        } else {
            output.push_str(&format!("{}\n", title));
        }
        output.push_str(&format!(
            "{} | {} | {} lines\n",
            metadata.filename,
            source_label(metadata.source),
            metadata.line_count
        ));

        output.push_str(&self.header("Contact"));
        let contact = profile.contact();
        output.push_str(&self.field("Title", profile.title()));
        output.push_str(&self.field("Email", contact.email.as_deref()));
        output.push_str(&self.field("Phone", contact.phone.as_deref()));
        output.push_str(&self.field("Location", contact.location.as_deref()));
        for link in profile.all_links() {
            output.push_str(&format!("  🔗 {}\n", link));
        }

        if let Some(summary) = profile.summary() {
            output.push_str(&self.header("Summary"));
            output.push_str(&format!("  {}\n", summary));
        }

        if !profile.experience().is_empty() {
            output.push_str(&self.header("Experience"));
            for entry in profile.experience() {
                let employer = entry.company.as_deref().or(entry.customer.as_deref());
                output.push_str(&format!(
                    "  • {} | {} | {}\n",
                    self.colorize(or_dash(employer), Color::Yellow),
                    or_dash(entry.role.as_deref()),
                    or_dash(entry.dates.as_deref())
                ));
                if !entry.technology.is_empty() {
                    output.push_str(&format!("    {}\n", entry.technology.join(", ")));
                }
            }
        }

        if !profile.education().is_empty() {
            output.push_str(&self.header("Education"));
            for entry in profile.education() {
                output.push_str(&format!(
                    "  • {} | {} | {}\n",
                    or_dash(entry.institution.as_deref()),
                    or_dash(entry.degree.as_deref()),
                    or_dash(entry.date.as_deref())
                ));
            }
        }

        if !profile.projects().is_empty() {
            output.push_str(&self.header("Projects"));
            for project in profile.projects() {
                output.push_str(&format!("  • {}", project.title));
                if let Some(date) = &project.date {
                    output.push_str(&format!(" ({})", date));
                }
                output.push('\n');
            }
        }

        if !profile.certifications().is_empty() {
            output.push_str(&self.header("Certifications"));
            for cert in profile.certifications() {
                output.push_str(&format!("  • {}\n", cert.title));
            }
        }

        if !profile.achievements().is_empty() {
            output.push_str(&self.header("Achievements"));
            for achievement in profile.achievements() {
                output.push_str(&format!("  • {}\n", achievement));
            }
        }

        output.push_str(&self.header("Skills"));
        if profile.skills().is_empty() {
            output.push_str("  -\n");
        } else {
            output.push_str(&format!("  {}\n", profile.skills().render()));
        }

        if !profile.warnings().is_empty() {
            output.push_str(&self.header("Warnings"));
            for warning in profile.warnings() {
                output.push_str(&format!("  ⚠️  {}\n", self.colorize(&warning.to_string(), Color::Red)));
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

/// Serialises the wire schema matching the profile's extraction source
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_profile(&self, profile: &ResumeProfile) -> Result<String> {
        let wire = profile.to_wire();
        if self.pretty {
            Ok(serde_json::to_string_pretty(&wire)?)
        } else {
            Ok(serde_json::to_string(&wire)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

pub struct MarkdownFormatter {
    include_metadata: bool,
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_profile(&self, profile: &ResumeProfile) -> Result<String> {
        let mut output = String::new();
        let metadata = profile.metadata();

        output.push_str(&format!("# {}\n\n", profile.name().unwrap_or("Unknown candidate")));
        if let Some(title) = profile.title() {
            output.push_str(&format!("_{}_\n\n", title));
        }

        if self.include_metadata {
            output.push_str(&format!(
                "**Source:** `{}` | **Method:** {} | **Parsed:** {}\n\n",
                metadata.filename,
                source_label(metadata.source),
                metadata.parsed_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        let contact = profile.contact();
        output.push_str("## Contact\n\n");
        output.push_str(&format!("- **Email:** {}\n", or_dash(contact.email.as_deref())));
        output.push_str(&format!("- **Phone:** {}\n", or_dash(contact.phone.as_deref())));
        output.push_str(&format!("- **Location:** {}\n", or_dash(contact.location.as_deref())));
        for link in profile.all_links() {
            output.push_str(&format!("- <{}>\n", link));
        }
        output.push('\n');

        if let Some(summary) = profile.summary() {
            output.push_str(&format!("## Summary\n\n{}\n\n", summary));
        }

        if !profile.experience().is_empty() {
            output.push_str("## Experience\n\n");
            output.push_str("| Employer | Role | Dates | Technology |\n");
            output.push_str("|----------|------|-------|------------|\n");
            for entry in profile.experience() {
                output.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    or_dash(entry.company.as_deref().or(entry.customer.as_deref())),
                    or_dash(entry.role.as_deref()),
                    or_dash(entry.dates.as_deref()),
                    entry.technology.join(", ")
                ));
            }
            output.push('\n');
        }

        if !profile.education().is_empty() {
            output.push_str("## Education\n\n");
            for entry in profile.education() {
                output.push_str(&format!(
                    "- **{}** {} {}\n",
                    or_dash(entry.institution.as_deref()),
                    entry.degree.as_deref().unwrap_or(""),
                    entry.date.as_deref().map(|d| format!("({})", d)).unwrap_or_default()
                ));
            }
            output.push('\n');
        }

        if !profile.projects().is_empty() {
            output.push_str("## Projects\n\n");
            for project in profile.projects() {
                output.push_str(&format!("### {}\n\n", project.title));
                if let Some(date) = &project.date {
                    output.push_str(&format!("_{}_\n\n", date));
                }
                if !project.description.is_empty() {
                    output.push_str(&format!("{}\n\n", project.description));
                }
            }
        }

        if !profile.certifications().is_empty() {
            output.push_str("## Certifications\n\n");
            for cert in profile.certifications() {
                if cert.details.is_empty() {
                    output.push_str(&format!("- {}\n", cert.title));
                } else {
                    output.push_str(&format!("- {}: {}\n", cert.title, cert.details));
                }
            }
            output.push('\n');
        }

        if !profile.achievements().is_empty() {
            output.push_str("## Achievements\n\n");
            for achievement in profile.achievements() {
                output.push_str(&format!("- {}\n", achievement));
            }
            output.push('\n');
        }

        if !profile.skills().is_empty() {
            output.push_str(&format!("## Skills\n\n{}\n\n", profile.skills().render()));
        }

        if !profile.warnings().is_empty() {
            output.push_str("## Warnings\n\n");
            for warning in profile.warnings() {
                output.push_str(&format!("- {}\n", warning));
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}
