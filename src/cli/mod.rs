//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::api::DEFAULT_HOST;
use crate::run::{KnownArgs, ListsArgs, NewArgs};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// Arguments of the `covcurate` binary.
///
/// `--verbosity` and `--host` are global and may follow any [Command].
///
/// ```rust
/// use clap::Parser;
/// use covcurate::cli::Command;
///
/// let input = ["covcurate", "new", "--gene", "S", "--characteristic-only", "--host", "localhost"];
/// let args = covcurate::Cli::parse_from(input);
/// assert_eq!(args.host, "localhost");
/// match args.command {
///     Command::New(args) => assert!(args.characteristic_only),
///     _ => unreachable!(),
/// }
/// serde_json::to_string_pretty(&args.verbosity)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "covcurate", author, version)]
#[clap(about = "covcurate curates SARS-CoV-2 variant previews from lineage frequencies and candidate mutation sets.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,

    /// Host of the sample database.
    #[clap(long, default_value_t = DEFAULT_HOST.to_string())]
    #[clap(global = true)]
    pub host: String,
}

/// CLI [commands](#variants). Used to decide which runner the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [lists](crate::run::lists()) runner.
    /// ## Examples
    /// ```rust
    /// use covcurate::{Cli, cli::Command};
    /// use clap::Parser;
    /// let args = Cli::parse_from(["covcurate", "lists"]);
    /// assert!(matches!(args.command, Command::Lists(_)));
    /// ```
    #[clap(about = "List the curated variant lists.")]
    Lists(ListsArgs),
    #[clap(about = "Preview known variants, filled up with the most frequent lineages.")]
    Known(KnownArgs),
    #[clap(about = "Discover new variants from candidate mutation sets.")]
    New(NewArgs),
}

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ValueEnum)]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // lowercase for RUST_LOG
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}
