use clap::Parser;

/// Demonstration front-end over the training-data sampling pipeline. Not a
/// UCI engine binary — the library's core (`nnue`, `datagen`, `chess`) has
/// no CLI dependency of its own; this is a thin `[[bin]]` target exercising
/// Component D end-to-end.
#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    /// Directory of binary training corpus files to sample from.
    #[clap(long, value_parser, value_name = "PATH")]
    pub data_dir: std::path::PathBuf,
    /// Restrict sampling to positions where either king sits in this bucket
    /// (0-31). A negative value (the default) disables the bucket filter in
    /// favour of the king-rank rejection filter.
    #[clap(long, value_name = "BUCKET", default_value = "-1")]
    pub king_bucket: i32,
    /// Seed for the sampler's RNG. Omit for a fresh, non-reproducible seed.
    #[clap(long, value_name = "SEED")]
    pub seed: Option<u64>,
    /// Number of accepted records to draw before stopping.
    #[clap(long, value_name = "N", default_value = "10")]
    pub count: usize,
}
