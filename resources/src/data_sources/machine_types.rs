use async_trait::async_trait;
use rhcs_model::clients::CatalogApi;
use rhcs_model::{Configuration, MachineType, Quantity};
use rhcs_provider::provider::{
    DataSource, ErrorKind, IntoProviderError, ProviderError, ProviderResult,
};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `rhcs_machine_types` schema.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineTypesState {
    pub items: Vec<MachineTypeState>,
}

impl Configuration for MachineTypesState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineTypeState {
    pub cloud_provider: String,
    pub id: String,
    pub name: String,
    /// Number of vCPUs.
    pub cpu: i64,
    /// Memory in bytes.
    pub ram: i64,
}

fn cpu_count(cpu: &Option<Quantity>) -> ProviderResult<i64> {
    let cpu = cpu.clone().unwrap_or_default();
    match cpu.unit.as_str() {
        "vCPU" => Ok(cpu.value as i64),
        unit => Err(ProviderError::validation(
            "Unknown CPU unit",
            format!("Don't know how to convert CPU unit '{}'", unit),
        )),
    }
}

fn ram_bytes(memory: &Option<Quantity>) -> ProviderResult<i64> {
    let memory = memory.clone().unwrap_or_default();
    let factor = match memory.unit.to_lowercase().as_str() {
        "b" => 1.0,
        "kb" => 1e3,
        "mb" => 1e6,
        "gb" => 1e9,
        "tb" => 1e12,
        "pb" => 1e15,
        "kib" => 2f64.powi(10),
        "mib" => 2f64.powi(20),
        "gib" => 2f64.powi(30),
        "tib" => 2f64.powi(40),
        "pib" => 2f64.powi(50),
        _ => {
            return Err(ProviderError::validation(
                "Unknown RAM unit",
                format!("Don't know how to convert RAM unit '{}'", memory.unit),
            ))
        }
    };
    Ok((memory.value * factor) as i64)
}

fn flatten(machine_type: &MachineType) -> ProviderResult<MachineTypeState> {
    Ok(MachineTypeState {
        cloud_provider: machine_type
            .cloud_provider
            .as_ref()
            .map(|provider| provider.id.clone())
            .unwrap_or_default(),
        id: machine_type.id.clone(),
        name: machine_type.name.clone(),
        cpu: cpu_count(&machine_type.cpu)?,
        ram: ram_bytes(&machine_type.memory)?,
    })
}

/// Every machine type, with CPU and memory normalized.
pub struct MachineTypesDataSource<C> {
    client: Arc<C>,
}

impl<C> MachineTypesDataSource<C>
where
    C: CatalogApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for MachineTypesDataSource<C>
where
    C: CatalogApi + 'static,
{
    type State = MachineTypesState;

    fn type_name(&self) -> &'static str {
        "rhcs_machine_types"
    }

    async fn read(
        &self,
        _config: MachineTypesState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<MachineTypesState> {
        let machine_types = self
            .client
            .all_machine_types()
            .await
            .context(ErrorKind::Remote, "Can't list machine types")?;
        Ok(MachineTypesState {
            items: machine_types
                .iter()
                .map(flatten)
                .collect::<ProviderResult<Vec<_>>>()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rhcs_model::IdRef;

    fn quantity(value: f64, unit: &str) -> Option<Quantity> {
        Some(Quantity {
            value,
            unit: unit.to_string(),
        })
    }

    #[test]
    fn units() {
        assert_eq!(cpu_count(&quantity(4.0, "vCPU")).unwrap(), 4);
        assert!(cpu_count(&quantity(4.0, "cores")).is_err());
        assert_eq!(ram_bytes(&quantity(16.0, "GiB")).unwrap(), 17_179_869_184);
        assert_eq!(ram_bytes(&quantity(2.0, "kB")).unwrap(), 2_000);
        assert_eq!(ram_bytes(&quantity(512.0, "B")).unwrap(), 512);
        let e = ram_bytes(&quantity(1.0, "words")).unwrap_err();
        assert_eq!(e.context(), Some("Unknown RAM unit"));
    }

    #[test]
    fn flatten_machine_type() {
        let machine_type = MachineType {
            id: "m5.xlarge".to_string(),
            name: "m5.xlarge - General Purpose".to_string(),
            cloud_provider: Some(IdRef::new("aws")),
            cpu: quantity(4.0, "vCPU"),
            memory: quantity(16.0, "GiB"),
            ..MachineType::default()
        };
        let state = flatten(&machine_type).unwrap();
        assert_eq!(state.cloud_provider, "aws");
        assert_eq!(state.cpu, 4);
        assert_eq!(state.ram, 17_179_869_184);
    }
}
