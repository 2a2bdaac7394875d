use anyhow::{Context, Result};
use clap::Parser;
use rhcs_provider::thumbprint::{ThumbprintFetcher, TlsThumbprintFetcher};

/// Compute the SHA-1 thumbprint used for the IAM OIDC provider of a cluster.
#[derive(Debug, Parser)]
pub(crate) struct Thumbprint {
    /// The OIDC endpoint, e.g. `https://oidc.op1.openshiftapps.com/abc123`.
    url: String,
}

impl Thumbprint {
    pub(crate) async fn run(self) -> Result<()> {
        let fetcher =
            TlsThumbprintFetcher::new().context("Unable to create the thumbprint fetcher")?;
        let thumbprint = fetcher
            .thumbprint(&self.url)
            .await
            .context(format!("Unable to get the thumbprint of '{}'", self.url))?;
        println!("{}", thumbprint);
        Ok(())
    }
}
