// Command-line entry point.
//
// Loads the input (or the built-in sample), builds the processor and the
// slide plan, renders the deck and writes it out. Nothing is written unless
// the whole run succeeds, and the HTML document is written last.
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trade_deck::config::ReportConfig;
use trade_deck::render::{HtmlRenderer, RandomCosmetics, TemplateConfig};
use trade_deck::{assembly, build_plan, loader, output, util, DataProcessor, ReportRun};

#[derive(Debug, Parser)]
#[command(name = "trade_deck", about = "Generate a trade market slide deck as HTML")]
struct Args {
    /// JSON input dataset; the built-in sample is used when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// CSV of `month,price` rows replacing the input's price history.
    #[arg(long)]
    prices: Option<PathBuf>,

    /// JSON run configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of synthetic shipment records.
    #[arg(long)]
    transactions: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Slide count the deck must match exactly.
    #[arg(long)]
    target: Option<usize>,

    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the resolved slide sequence as JSON.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Write the shipment records as CSV.
    #[arg(long)]
    records_csv: Option<PathBuf>,

    /// Print markdown previews of the plan and the first record batch.
    #[arg(long)]
    preview: bool,
}

fn resolve_config(args: &Args) -> Result<ReportConfig, Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => ReportConfig::from_json_file(path)?,
        None => ReportConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(n) = args.transactions {
        cfg.transaction_count = n;
    }
    if let Some(n) = args.batch_size {
        cfg.batch_size = n;
    }
    if let Some(n) = args.target {
        cfg.target_slides = n;
    }
    if let Some(out) = &args.out {
        cfg.output = out.clone();
    }
    if args.manifest.is_some() {
        cfg.manifest = args.manifest.clone();
    }
    if args.records_csv.is_some() {
        cfg.records_csv = args.records_csv.clone();
    }
    Ok(cfg)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let cfg = resolve_config(&args)?;

    let mut raw = match &args.input {
        Some(path) => loader::load_input(path)?,
        None => {
            info!("no input given, using built-in sample dataset");
            loader::sample_input()
        }
    };
    if let Some(path) = &args.prices {
        let (points, report) = loader::load_price_history_csv(path)?;
        println!(
            "Price history: {} rows read, {} loaded, {} skipped",
            util::format_int(report.total_rows),
            util::format_int(report.loaded_rows),
            util::format_int(report.parse_errors)
        );
        raw.price_history = points;
    }

    let seed = cfg.seed.unwrap_or_else(rand::random);
    info!(seed, "seeding generators");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let processor = DataProcessor::new(&raw, cfg.transaction_count, &mut rng)?;

    let plan = build_plan(processor.records().len(), cfg.batch_size)?;
    plan.validate(cfg.target_slides)?;

    if args.preview {
        println!("Slide plan\n");
        output::preview_table_rows(&output::section_rows(&plan), plan.sections().len());
        println!("First shipment batch\n");
        output::preview_table_rows(processor.records(), cfg.batch_size);
    }

    let cosmetics = RandomCosmetics::new(ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)));
    let mut renderer = HtmlRenderer::new(Box::new(cosmetics));
    let title = cfg.title.clone().unwrap_or_else(|| processor.view().product.name.clone());
    let mut report = ReportRun::new(&plan, &processor, cfg.target_slides);
    let document = report.execute(&title, &mut renderer)?;

    let template = TemplateConfig::default();
    let html = document.to_html(&template);
    let slides = match cfg.manifest {
        Some(_) => assembly::resolve_all(&plan, &processor)?,
        None => Vec::new(),
    };
    let files = output::ReportFiles {
        html_path: &cfg.output,
        html: &html,
        manifest: cfg.manifest.as_deref().map(|path| (path, slides.as_slice())),
        records_csv: cfg.records_csv.as_deref().map(|path| (path, processor.records())),
    };
    files.write()?;

    if let Some(path) = &cfg.manifest {
        println!("Slide manifest saved to {}", path.display());
    }
    if let Some(path) = &cfg.records_csv {
        println!("Shipment records exported to {}", path.display());
    }
    println!(
        "Wrote {} slides to {}",
        util::format_int(document.len()),
        cfg.output.display()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}
