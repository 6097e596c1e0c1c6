use anyhow::Result;

use llm_demos::cli::Args;
use llm_demos::demos::{self, DemoConfig};
use llm_demos::display::{Printer, should_color};
use llm_demos::logging::init_logging;

fn main() -> Result<()> {
    // Load .env from the current directory if present; real environment wins
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.debug);

    let command = args.command();
    let config = DemoConfig::from(&args);
    tracing::debug!(?command, db_path = ?config.db_path, "starting demo");

    let mut out = Printer::stdout(should_color(args.no_color));
    demos::run(&command, &config, &mut out)
}
