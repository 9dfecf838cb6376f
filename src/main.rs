use anyhow::Context;
use clap::Parser;
use medprep::batch;
use medprep::cli::Args;
use medprep::logging;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.json_logs);

    let config = args.pipeline_config()?;
    let spec = args.batch_spec();
    let report = batch::run(&spec, &config, args.execution_mode())
        .with_context(|| format!("Failed to process {}", spec.input.display()))?;

    if !report.is_success() {
        // Failures were already logged as they happened
        std::process::exit(1);
    }
    Ok(())
}
