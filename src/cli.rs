use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-split")]
#[command(about = "A CLI tool for splitting PDF documents at pages matching text rules")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output directory for the archive and split files
    #[arg(short, long, global = true, default_value = "./output")]
    pub output: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a PDF into parts and package them as a ZIP archive
    Split(SplitArgs),

    /// Show which pages match and the parts that would be produced
    Analyze(AnalyzeArgs),

    /// Validate input sources and rules
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Default)]
pub struct RuleArgs {
    /// Rule tree as JSON, e.g. '{"operator": "OR", "conditions": [...]}'
    #[arg(long, value_name = "JSON", conflicts_with = "rules_file")]
    pub rules: Option<String>,

    /// Read the rule tree JSON from a file
    #[arg(long, value_name = "FILE")]
    pub rules_file: Option<PathBuf>,

    /// Start a new part on pages containing this text (repeatable)
    #[arg(long, value_name = "TEXT")]
    pub contains: Vec<String>,

    /// Start a new part on pages not containing this text (repeatable)
    #[arg(long, value_name = "TEXT")]
    pub not_contains: Vec<String>,

    /// Treat malformed rule nodes as never matching instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Maximum number of pages to process (at least 1)
    #[arg(long, default_value = "1000", value_parser = parse_max_pages)]
    pub max_pages: usize,
}

#[derive(Args)]
pub struct SplitArgs {
    /// Input PDF (file path or URL)
    #[arg(required = true, value_name = "SOURCE")]
    pub source: String,

    #[command(flatten)]
    pub rules: RuleArgs,

    /// Archive file name inside the output directory
    #[arg(long, default_value = "split_pdfs.zip")]
    pub archive_name: String,

    /// Leave summary.json out of the archive
    #[arg(long)]
    pub no_summary: bool,

    /// Also write each part as a separate file
    #[arg(long)]
    pub unpacked: bool,

    /// Force overwrite existing output files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input PDF (file path or URL)
    #[arg(required = true, value_name = "SOURCE")]
    pub source: String,

    #[command(flatten)]
    pub rules: RuleArgs,

    /// Output analysis to JSON file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Show the decision for every scanned page
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input sources (file paths or URLs)
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<String>,

    #[command(flatten)]
    pub rules: RuleArgs,

    /// Load each source and check that it parses as a PDF
    #[arg(long)]
    pub check_access: bool,
}

fn parse_max_pages(value: &str) -> Result<usize, String> {
    let pages: usize = value
        .parse()
        .map_err(|_| format!("'{}' is not a page count", value))?;
    if pages == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_pages_defaults_to_cap() {
        let cli = Cli::try_parse_from(["pdf-split", "split", "in.pdf"]).unwrap();
        match cli.command {
            Commands::Split(args) => assert_eq!(args.rules.max_pages, 1000),
            _ => panic!("expected split command"),
        }
    }

    #[test]
    fn test_zero_max_pages_is_rejected() {
        assert!(Cli::try_parse_from(["pdf-split", "split", "in.pdf", "--max-pages", "0"]).is_err());
        assert!(Cli::try_parse_from(["pdf-split", "analyze", "in.pdf", "--max-pages", "x"]).is_err());
        assert!(Cli::try_parse_from(["pdf-split", "split", "in.pdf", "--max-pages", "5"]).is_ok());
    }
}
