use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::time::Instant;
use tracing::{error, info, warn};

use inboxlens::report::{write_json, write_text};
use inboxlens::utils::{parse_day, setup_logging, validate_args};
use inboxlens::{
    build_report, init_default_keywords, keywords, loader, models, normalize, Args, BodyCleaner,
    EmailTable, FilterSpec, ReportOptions, StopwordSet,
};

fn load_table(args: &Args) -> Result<EmailTable> {
    let cleaner = if args.no_cleanup {
        BodyCleaner::disabled()
    } else {
        let cleanup_keywords = keywords::load_cleanup_keywords(args.keywords.as_deref())?;
        BodyCleaner::new(cleanup_keywords.as_slice())?
    };

    let raw = loader::load_file(&args.input_path())?;
    Ok(normalize::normalize(&raw, &cleaner)?)
}

fn build_filter(args: &Args, table: &EmailTable) -> Result<FilterSpec> {
    let mut spec = FilterSpec::full_range(table);
    if let Some(start) = args.start.as_deref() {
        spec.start_date = Some(parse_day(start)?);
    }
    if let Some(end) = args.end.as_deref() {
        spec.end_date = Some(parse_day(end)?);
    }

    if !args.senders.is_empty() {
        let known = table.senders();
        for sender in &args.senders {
            if known.binary_search(sender).is_err() {
                warn!(action = "filter", component = "senders", sender = %sender, "Sender not found in data");
            }
        }
        spec = spec.with_senders(args.senders.iter().cloned());
    }

    if let Some(keyword) = args.keyword.as_deref() {
        spec = spec.with_keyword(keyword);
    }
    Ok(spec)
}

fn run(args: &Args) -> Result<()> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "dashboard", "Starting email analysis");

    let models = models::init()?;
    let table = load_table(args)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list_senders {
        for sender in table.senders() {
            writeln!(out, "{}", sender)?;
        }
        return Ok(());
    }

    let spec = build_filter(args, &table)?;
    let stopwords = match args.stopwords.as_deref() {
        Some(custom) => StopwordSet::default().with_custom_csv(custom),
        None => StopwordSet::default(),
    };
    let options = ReportOptions {
        title: args.title.clone(),
        top: args.top,
        ner_sample: args.ner_sample,
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let report = build_report(&table, &spec, &stopwords, models, &options, &mut rng);

    if args.json {
        write_json(&report, &mut out)?;
    } else {
        write_text(&report, &mut out).context("Failed to write report")?;
    }

    info!(
        action = "complete",
        component = "dashboard",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Analysis completed successfully"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    validate_args(&args)?;

    if args.init {
        return init_default_keywords();
    }

    if let Err(e) = run(&args) {
        error!(action = "failed", component = "dashboard", error = %e, "Analysis failed");
        eprintln!("{}", e);
        if let Some(hint) = e.downcast_ref::<inboxlens::Error>().and_then(|e| e.hint()) {
            eprintln!("{}", hint);
        }
        std::process::exit(1);
    }
    Ok(())
}
