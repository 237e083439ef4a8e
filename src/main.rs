#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result};
#[cfg(all(feature = "cli", not(feature = "api")))]
use color_eyre::{eyre::eyre, Help};
#[cfg(all(feature = "cli", feature = "api"))]
use covcurate::api::ApiClient;
#[cfg(feature = "cli")]
use covcurate::{cli::Command, run, Cli};
#[cfg(all(feature = "cli", feature = "api"))]
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Report> {
    #[cfg(feature = "cli")]
    {
        // ------------------------------------------------------------------------
        // CLI Setup

        // Parse CLI parameters
        let args = Cli::parse();

        // initialize color_eyre crate for colorized logs
        color_eyre::install()?;

        // Set logging/verbosity level via RUST_LOG
        std::env::set_var("RUST_LOG", args.verbosity.to_string());

        // initialize env_logger crate for logging/verbosity level
        env_logger::init();

        #[cfg(feature = "api")]
        let client = Arc::new(ApiClient::new(&args.host)?);

        match args.command {
            // Curated lists, offline
            Command::Lists(args) => println!("{}", run::lists(&args)?),
            // Known variant preview
            #[cfg(feature = "api")]
            Command::Known(args) => {
                let table = run::known_variants(&args, Arc::clone(&client), client).await?;
                println!("{table}");
            }
            // New variant discovery
            #[cfg(feature = "api")]
            Command::New(args) => println!("{}", run::new_variants(&args, client).await?),
            #[cfg(not(feature = "api"))]
            Command::Known(_) | Command::New(_) => {
                return Err(eyre!("The sample database is not available in this build."))
                    .suggestion("Rebuild with: --features api");
            }
        }
    }

    Ok(())
}
