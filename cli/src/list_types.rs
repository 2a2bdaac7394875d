use anyhow::{Context, Result};
use clap::Parser;
use rhcs_provider::registry::Registry;
use serde_json::json;

/// List the resource and data source types.
#[derive(Debug, Parser)]
pub(crate) struct ListTypes {
    /// Output the types in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl ListTypes {
    pub(crate) fn run(self, registry: &Registry) -> Result<()> {
        if self.json {
            let types = json!({
                "resources": registry.resource_types().collect::<Vec<_>>(),
                "data_sources": registry.data_source_types().collect::<Vec<_>>(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&types).context("Could not serialize the types")?
            );
            return Ok(());
        }
        println!("Resources:");
        for type_name in registry.resource_types() {
            println!("  {}", type_name);
        }
        println!("Data sources:");
        for type_name in registry.data_source_types() {
            println!("  {}", type_name);
        }
        Ok(())
    }
}
