//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{check_max_creation_days, HarvestConfig};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::search::{OfferSearch, QueryParams};
use crate::transport::HttpTransport;
use crate::types::Record;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let search = Self::build_search(&config)?;

        match &self.cli.command {
            Commands::Count { params } => Self::count(&search, params).await,
            Commands::Fetch {
                params,
                max_creation_days,
                output,
                format,
                max_records,
            } => {
                let params = QueryParams::from_pairs(params)?;
                let days = match *max_creation_days {
                    Some(days) => {
                        check_max_creation_days("--max-creation-days", days)?;
                        days
                    }
                    None => config.search.max_creation_days,
                };
                match output {
                    Some(path) => {
                        let file = BufWriter::new(create_output(path)?);
                        Self::fetch(&search, params, days, *format, *max_records, file).await
                    }
                    None => {
                        let stdout = BufWriter::new(io::stdout().lock());
                        Self::fetch(&search, params, days, *format, *max_records, stdout).await
                    }
                }
            }
        }
    }

    /// Load the config file if given, then apply credential overrides
    fn load_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.cli.config {
            Some(path) => HarvestConfig::load(path)?,
            None => HarvestConfig::default(),
        };
        config.apply_credentials(self.cli.client_id.clone(), self.cli.client_secret.clone());
        Ok(config)
    }

    /// Wire the HTTP client, transport and search together
    pub fn build_search(config: &HarvestConfig) -> Result<OfferSearch> {
        let auth = config.to_auth_config()?;
        let client = HttpClient::with_auth(config.to_http_client_config(), auth)?;
        let transport = Arc::new(HttpTransport::new(client));

        Ok(OfferSearch::new(transport)
            .with_config(config.search.clone())
            .with_search_path(config.api.search_path.clone()))
    }

    async fn count(search: &OfferSearch, params: &[String]) -> Result<()> {
        let params = QueryParams::from_pairs(params)?;
        match search.count(&params).await? {
            Some(total) => println!("{total}"),
            None => println!("unknown"),
        }
        Ok(())
    }

    async fn fetch<W: Write>(
        search: &OfferSearch,
        params: QueryParams,
        max_creation_days: i64,
        format: OutputFormat,
        max_records: Option<usize>,
        mut out: W,
    ) -> Result<()> {
        let started = Instant::now();
        info!(%params, max_creation_days, "Starting harvest");

        let mut offers = search.offers_with_max_days(params, max_creation_days);
        let mut written = 0usize;

        'harvest: while let Some(chunk) = offers.next_chunk().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e @ Error::UnsplittableWindow { .. }) => {
                    error!(error = %e, "Offers of this window are not retrievable");
                    continue;
                }
                Err(e) => return Err(e),
            };

            for record in &chunk.records {
                if max_records.is_some_and(|max| written >= max) {
                    info!(written, "Record limit reached");
                    break 'harvest;
                }
                write_record(&mut out, record, format)?;
                written += 1;
            }
        }
        out.flush()?;

        let stats = offers.stats();
        info!(
            records = written,
            count_probes = stats.count_probes,
            windows_split = stats.windows_split,
            windows_walked = stats.windows_walked,
            windows_aborted = stats.windows_aborted,
            pages_fetched = stats.pages_fetched,
            pages_skipped = stats.pages_skipped,
            duration_ms = started.elapsed().as_millis() as u64,
            "Harvest complete"
        );
        Ok(())
    }
}

fn create_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create output file {}", path.display()))
}

/// Write one offer in the requested format
pub fn write_record<W: Write>(out: &mut W, record: &Record, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => serde_json::to_writer(&mut *out, record)?,
        OutputFormat::Pretty => serde_json::to_writer_pretty(&mut *out, record)?,
    }
    writeln!(out)?;
    Ok(())
}
