use crate::input::read_optional_json;
use anyhow::{Context, Result};
use clap::Parser;
use rhcs_provider::json_display;
use rhcs_provider::registry::Registry;
use std::path::PathBuf;

/// Read a data source, e.g. `rhcs data rhcs_versions`.
#[derive(Debug, Parser)]
pub(crate) struct Data {
    /// The data source type, e.g. `rhcs_machine_types`.
    type_name: String,
    /// JSON file with the data source arguments, `-` for stdin.
    #[clap(long = "input")]
    input: Option<PathBuf>,
}

impl Data {
    pub(crate) async fn run(self, registry: &Registry) -> Result<bool> {
        let config = read_optional_json(self.input.as_deref()).await?;
        let response = registry
            .read_data(&self.type_name, config)
            .await
            .context(format!("Unable to read '{}'", self.type_name))?;
        println!("{}", json_display(&response));
        Ok(!response.diagnostics.has_error())
    }
}
