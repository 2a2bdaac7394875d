use crate::input::read_json;
use anyhow::{Context, Result};
use clap::Parser;
use rhcs_provider::registry::{Operation, Registry};
use rhcs_provider::json_display;
use std::path::PathBuf;

/// Run an operation on a resource, e.g. `rhcs resource rhcs_machine_pool read --state pool.json`.
#[derive(Debug, Parser)]
pub(crate) struct ResourceCommand {
    /// The resource type, e.g. `rhcs_cluster_rosa_classic`.
    type_name: String,
    #[clap(subcommand)]
    operation: ResourceOperation,
}

#[derive(Debug, Parser)]
enum ResourceOperation {
    /// Create the object described by a plan.
    Create {
        /// JSON file with the plan, `-` for stdin.
        #[clap(long = "plan")]
        plan: PathBuf,
    },
    /// Refresh a state from the API.
    Read {
        /// JSON file with the current state, `-` for stdin.
        #[clap(long = "state")]
        state: PathBuf,
    },
    /// Change the object described by a state to match a plan.
    Update {
        #[clap(long = "state")]
        state: PathBuf,
        #[clap(long = "plan")]
        plan: PathBuf,
    },
    /// Delete the object described by a state.
    Delete {
        #[clap(long = "state")]
        state: PathBuf,
    },
    /// Build the state of an existing object from its import identifier.
    Import {
        /// E.g. `<cluster_id>,<machine_pool_id>` for machine pools.
        #[clap(long = "id")]
        id: String,
    },
}

impl ResourceOperation {
    async fn into_operation(self) -> Result<Operation> {
        Ok(match self {
            ResourceOperation::Create { plan } => Operation::Create {
                plan: read_json(&plan).await?,
            },
            ResourceOperation::Read { state } => Operation::Read {
                state: read_json(&state).await?,
            },
            ResourceOperation::Update { state, plan } => Operation::Update {
                state: read_json(&state).await?,
                plan: read_json(&plan).await?,
            },
            ResourceOperation::Delete { state } => Operation::Delete {
                state: read_json(&state).await?,
            },
            ResourceOperation::Import { id } => Operation::Import { id },
        })
    }
}

impl ResourceCommand {
    pub(crate) async fn run(self, registry: &Registry) -> Result<bool> {
        let operation = self.operation.into_operation().await?;
        let name = operation.name();
        let response = registry
            .apply(&self.type_name, operation)
            .await
            .context(format!("Unable to {} '{}'", name, self.type_name))?;
        println!("{}", json_display(&response));
        Ok(!response.diagnostics.has_error())
    }
}
