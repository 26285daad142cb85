#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use incremental_nnue::datagen::sampler::TrainingDataLoader;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    unsafe {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    let cli = cli::Cli::parse();

    let mut rng = StdRng::seed_from_u64(cli.seed.unwrap_or_else(|| rand::rng().random()));

    let mut loader = TrainingDataLoader::init(&cli.data_dir, &mut rng)
        .with_context(|| format!("failed to scan training directory {}", cli.data_dir.display()))?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "training directory {} contains no file larger than 32 bytes",
                cli.data_dir.display()
            )
        })?;

    println!("info string sampling {} accepted position(s) from {}", cli.count, cli.data_dir.display());

    let mut accepted = 0usize;
    while accepted < cli.count {
        match loader.fetch_next(&mut rng, cli.king_bucket)? {
            Some((entry, position)) => {
                accepted += 1;
                println!(
                    "{accepted}/{}: score={} wdl={:?} pieces={} side_to_move={:?}",
                    cli.count,
                    entry.score(),
                    entry.wdl()?,
                    position.num_pieces(),
                    position.side_to_move,
                );
            }
            None => bail!("sampling stream exhausted before reaching {} accepted records", cli.count),
        }
    }

    let (refreshes, updates) = incremental_nnue::stats::snapshot();
    println!("info string accumulator refreshes={refreshes} updates={updates}");

    Ok(())
}
