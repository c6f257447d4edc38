use clap::{Args, Parser, Subcommand};

/// `StateTable::new`'s default capacity when an operator's CLI surface
/// doesn't override `-M`.
pub const DEFAULT_TABLE_SIZE: usize = 10_000;

/// Flags common to every keyed operator's CLI surface: which label(s)
/// key/target it, how big its state table is, and where a shared table
/// and output label come from.
#[derive(Args, Debug, Clone)]
pub struct OperatorArgs {
    /// Label names or dotted nested paths (`OUTER.INNER`) the operator
    /// keys or targets, in operator-specific order.
    pub labels: Vec<String>,

    #[arg(short = 'M', long = "table-size", default_value_t = DEFAULT_TABLE_SIZE)]
    pub table_size: usize,

    /// Share this operator's state table with others registered under
    /// the same label.
    #[arg(short = 'J', long = "share-label")]
    pub share_label: Option<String>,

    /// Repeatable: label(s) carrying the value(s) this operator
    /// aggregates or compares, in single- or multi-value mode.
    #[arg(short = 'V', long = "value-label")]
    pub value_label: Vec<String>,

    #[arg(short = 'L', long = "out-label")]
    pub out_label: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CharcntArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    /// Hex-encoded byte dictionary, e.g. "3d" for '='.
    #[arg(long)]
    pub dict: String,
}

#[derive(Args, Debug, Clone)]
pub struct StrlenArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    /// `<`, `>`, or `=`.
    #[arg(short = 'g', long)]
    pub comparator: Option<String>,
    #[arg(short = 't', long)]
    pub threshold: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct DuplicatesArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    /// Label attached to a duplicate event's members.
    #[arg(long, default_value = "DUPLICATE")]
    pub dup_label: String,
    /// Label attached to a first-seen event's members, if tagging those too.
    #[arg(long)]
    pub unique_label: Option<String>,
    #[arg(long, default_value_t = 1_000_000)]
    pub rotate_after: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CountfilterArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    #[arg(long, default_value_t = 2.0)]
    pub base: f64,
}

#[derive(Args, Debug, Clone)]
pub struct KeyaddArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    /// Emit each key's sum as a percentage of the grand total on flush.
    #[arg(short = 'P', long)]
    pub percent: bool,
    /// Keep only the key member on emission, dropping count/sum.
    #[arg(short = 'R', long)]
    pub key_only: bool,
    /// Emit exactly once, when a key's count reaches this threshold,
    /// instead of accumulating until flush.
    #[arg(long)]
    pub initial_threshold: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct KeyewmaArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    #[arg(short = 'a', long, default_value_t = ops::keyewma::DEFAULT_ALPHA)]
    pub alpha: f64,
}

#[derive(Args, Debug, Clone)]
pub struct KeydiffArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct KeyrateArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    /// Label carrying the event's timestamp; wall-clock time if absent.
    #[arg(long)]
    pub time_label: Option<String>,
    #[arg(long, default_value_t = 1.0)]
    pub epoch_seconds: f64,
    #[arg(long, default_value_t = 0)]
    pub min: i64,
    #[arg(long, default_value_t = i64::MAX)]
    pub max: i64,
}

#[derive(Args, Debug, Clone)]
pub struct KeytransArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    #[arg(long)]
    pub time_label: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PeriodicArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    #[arg(long)]
    pub time_label: Option<String>,
    #[arg(long, default_value_t = 4)]
    pub bins: usize,
    #[arg(long)]
    pub min_tdiff_ms: Option<u64>,
    #[arg(long)]
    pub max_tdiff_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct PersistArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    #[arg(long)]
    pub time_label: Option<String>,
    #[arg(long, default_value_t = 8)]
    pub bins: u32,
    #[arg(long, default_value_t = 1000)]
    pub bin_width_ms: u64,
    #[arg(long, default_value_t = 4)]
    pub threshold: u32,
}

#[derive(Args, Debug, Clone)]
pub struct GroupeventsArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    /// Labels whose combined value forms the session/common hash.
    #[arg(long = "common-label")]
    pub common_label: Vec<String>,
    #[arg(long, default_value_t = 16)]
    pub max_values: usize,
}

#[derive(Args, Debug, Clone)]
pub struct KeysortArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
    #[arg(short = 'n', long, default_value_t = 8)]
    pub window: usize,
}

#[derive(Args, Debug, Clone)]
pub struct RemovenestArgs {
    #[command(flatten)]
    pub common: OperatorArgs,
}

#[derive(Subcommand, Debug)]
pub enum Operator {
    Charcnt(CharcntArgs),
    Strlen(StrlenArgs),
    Duplicates(DuplicatesArgs),
    Countfilter(CountfilterArgs),
    Keyadd(KeyaddArgs),
    Keyewma(KeyewmaArgs),
    Keydiff(KeydiffArgs),
    Keyrate(KeyrateArgs),
    Keytrans(KeytransArgs),
    Periodic(PeriodicArgs),
    Persist(PersistArgs),
    Groupevents(GroupeventsArgs),
    Keysort(KeysortArgs),
    Removenest(RemovenestArgs),
}

/// Top-level CLI: `dataflow <operator> [flags] [labels...]`, reading
/// records from stdin - parse errors print to stderr and exit non-zero
/// via `clap`'s own `Parser::parse` failure path.
#[derive(Parser, Debug)]
#[command(name = "dataflow", about = "Streaming keyed-dataflow operator runner")]
pub struct Cli {
    #[command(subcommand)]
    pub operator: Operator,
}
