use std::path::PathBuf;

use clap::Parser;

use musubi_trainer::{CorefConfig, Trainer};

/// Train and evaluate the mention-ranking coreference model.
#[derive(Debug, Parser)]
#[command(name = "train")]
struct Args {
    /// Pretrained word embedding file (one header line, then one
    /// `<token> <floats>` line per token).
    #[arg(long)]
    embeddings: PathBuf,

    /// Dimensionality of the pretrained embeddings.
    #[arg(long, default_value_t = 300)]
    embedding_size: usize,

    /// Training split (JSON-lines).
    #[arg(long)]
    train: PathBuf,

    /// Development split, evaluated after every epoch.
    #[arg(long)]
    dev: PathBuf,

    /// Test split, evaluated once after training.
    #[arg(long)]
    test: PathBuf,

    /// Number of passes over the training split.
    #[arg(long, default_value_t = 5)]
    epochs: usize,

    /// Optional path to dump the trained weights (safetensors).
    #[arg(long)]
    save_model: Option<PathBuf>,
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = CorefConfig::new(args.embedding_size);
    let mut trainer = Trainer::new(&args.embeddings, config)?;
    trainer.train(&args.train, &args.dev, &args.test, args.epochs)?;
    if let Some(path) = &args.save_model {
        trainer.save_model(path)?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Training failed: {e}");
        std::process::exit(1);
    }
}
