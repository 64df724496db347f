mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{AnalyzeArgs, Cli, Commands, RuleArgs, SplitArgs, ValidateArgs};
use pdf_rule_splitter::{
    BoundaryDetector, ContentFetcher, DocumentSplitter, EvaluationMode, OutputWriter, PdfSource,
    Result, Rule, RuleEvaluator, RuleParser, SourceDocument, SplitConfig, SplitterError,
};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Split(args) => handle_split_command(args, &cli.output).await,
        Commands::Analyze(args) => handle_analyze_command(args).await,
        Commands::Validate(args) => handle_validate_command(args).await,
    };

    if let Err(e) = result {
        error!("Operation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn evaluation_mode(args: &RuleArgs) -> EvaluationMode {
    if args.lenient {
        EvaluationMode::Lenient
    } else {
        EvaluationMode::Strict
    }
}

/// Combines the JSON rule tree and the plain pattern flags into one rule.
/// Both present means a page splits when either of them matches.
async fn load_rule(args: &RuleArgs) -> Result<Option<Rule>> {
    let parser = RuleParser::new(evaluation_mode(args));

    let json = match (&args.rules, &args.rules_file) {
        (Some(json), _) => Some(json.clone()),
        (None, Some(path)) => Some(tokio::fs::read_to_string(path).await.map_err(|e| {
            SplitterError::FileNotFound {
                path: format!("{} ({})", path.display(), e),
            }
        })?),
        (None, None) => None,
    };

    let tree = match json {
        Some(json) => parser.parse_str(&json)?,
        None => None,
    };
    let patterns = RuleParser::from_patterns(&args.contains, &args.not_contains);

    Ok(RuleParser::combine(tree, patterns))
}

fn split_config(args: &RuleArgs, include_summary: bool) -> SplitConfig {
    SplitConfig {
        max_pages: args.max_pages,
        evaluation_mode: evaluation_mode(args),
        include_summary,
        ..SplitConfig::default()
    }
}

async fn handle_split_command(args: &SplitArgs, output_dir: &PathBuf) -> Result<()> {
    let rule = load_rule(&args.rules).await?;
    if rule.is_none() {
        warn!("No rules given, the document will be kept as a single part");
    }

    let writer = OutputWriter::new(output_dir, args.force);
    writer.check_target(&args.archive_name)?;

    let document = ContentFetcher::fetch_document(&args.source).await?;
    let source = PdfSource::from_bytes(&document.bytes)?;
    let config = split_config(&args.rules, !args.no_summary);

    let outcome =
        DocumentSplitter::split_document(&source, &document.base_name, rule.as_ref(), &config)?;

    writer
        .write_outcome(&args.archive_name, &outcome, args.unpacked)
        .await?;

    if outcome.summary.truncated {
        warn!(
            "Only the first {} of {} pages were processed",
            outcome.split_points.capped_page_count, outcome.split_points.page_count
        );
    }

    let summary = serde_json::to_string_pretty(&outcome.summary)
        .context("Failed to serialize split summary")?;
    println!("{}", summary);

    Ok(())
}

async fn load_pdf(source: &str) -> Result<PdfSource> {
    let document = ContentFetcher::fetch_document(source).await?;
    PdfSource::from_bytes(&document.bytes)
}

async fn handle_analyze_command(args: &AnalyzeArgs) -> Result<()> {
    let rule = load_rule(&args.rules).await?;
    let document = ContentFetcher::fetch_document(&args.source).await?;
    let source = PdfSource::from_bytes(&document.bytes)?;

    let detector = BoundaryDetector::new(args.rules.max_pages, evaluation_mode(&args.rules));
    let matched = detector.matching_pages(rule.as_ref(), &source)?;
    let split_points = detector.split_points_from(&matched, source.page_count());
    let segments = DocumentSplitter::build_segments(&split_points.points)?;

    println!("\n=== Analysis for '{}' ===", document.file_name);
    println!("Source type: {:?}", document.source_type);
    println!("Total pages: {}", split_points.page_count);
    println!("Pages scanned: {}", split_points.capped_page_count);
    if split_points.truncated {
        println!("(only first {} pages processed)", detector.max_pages());
    }
    match &rule {
        Some(rule) => println!("Rule: {:?}", rule),
        None => println!("Rule: none (no splitting)"),
    }
    println!("Matching pages: {}", matched.len());

    if args.detailed {
        println!("\nPage Decisions:");
        for index in 0..split_points.capped_page_count {
            let decision = if matched.binary_search(&index).is_ok() {
                "match"
            } else {
                "-"
            };
            println!("  Page {}: {}", index + 1, decision);
        }
    }

    println!("\nPlanned Parts:");
    for (idx, segment) in segments.iter().enumerate() {
        println!(
            "  {}: Pages {}-{} ({} pages)",
            DocumentSplitter::part_name(&document.base_name, idx + 1, "pdf"),
            segment.start + 1,
            segment.end,
            segment.len()
        );
    }

    if let Some(json_path) = &args.json_output {
        let analysis = serde_json::json!({
            "source": document.file_name,
            "fetched_at": document.fetched_at,
            "split_points": split_points,
            "matching_pages": matched,
            "segments": segments,
        });
        let json_content = serde_json::to_string_pretty(&analysis)
            .context("Failed to serialize analysis results")?;

        tokio::fs::write(json_path, json_content)
            .await
            .context("Failed to write JSON analysis file")?;

        info!("Analysis results written to: {}", json_path.display());
    }

    Ok(())
}

async fn handle_validate_command(args: &ValidateArgs) -> Result<()> {
    info!("Validating {} sources", args.sources.len());

    let mut invalid = Vec::new();

    match load_rule(&args.rules).await {
        Ok(Some(rule)) => {
            let evaluator = RuleEvaluator::new(evaluation_mode(&args.rules));
            match evaluator.validate(&rule) {
                Ok(_) => info!("✓ Rules are valid"),
                Err(e) => {
                    error!("✗ Invalid rules - {}", e);
                    invalid.push(("rules".to_string(), e.to_string()));
                }
            }
        }
        Ok(None) => info!("No rules given"),
        Err(e) => {
            error!("✗ Invalid rules - {}", e);
            invalid.push(("rules".to_string(), e.to_string()));
        }
    }

    for source in &args.sources {
        if let Err(e) = ContentFetcher::validate_source(source).await {
            error!("✗ Invalid: {} - {}", source, e);
            invalid.push((source.clone(), e.to_string()));
            continue;
        }
        info!("✓ Valid: {}", source);

        if args.check_access {
            match load_pdf(source).await {
                Ok(pdf) => info!("  Readable PDF, {} pages found", pdf.page_count()),
                Err(e) => {
                    error!("  Cannot read document: {}", e);
                    invalid.push((source.clone(), format!("Access error: {}", e)));
                }
            }
        }
    }

    println!("\n=== Validation Summary ===");
    if !invalid.is_empty() {
        println!("Invalid inputs:");
        for (input, error) in &invalid {
            println!("  - {}: {}", input, error);
        }
        return Err(SplitterError::Anyhow(anyhow::anyhow!(
            "{} inputs failed validation",
            invalid.len()
        )));
    }

    println!("All inputs are valid!");
    Ok(())
}
