mod cli;

use anyhow::Result;
use cli::{Args, Command};
use quadrant_split::{split_and_remap, split_directory};

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();
    args.validate()?;

    let artifacts = match &args.command {
        Command::Split {
            image,
            annotation,
            output_dir,
            options,
        } => split_and_remap(image, annotation, output_dir, &options.to_config())?,
        Command::Batch {
            input_dir,
            output_root,
            options,
        } => split_directory(input_dir, output_root, &options.to_config())?,
    };

    tracing::info!("Done: {} sub-image(s) written", artifacts.len());

    Ok(())
}
