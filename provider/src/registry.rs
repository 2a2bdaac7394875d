/*!

The host talks to resources and data sources through JSON documents and type names. The
[`Registry`] maps each type name to a type erased [`DynResource`] or [`DynDataSource`]; a blanket
implementation adapts every [`Resource`] and [`DataSource`] by decoding the documents into their
typed state and turning errors into diagnostics.

!*/

use crate::provider::{DataSource, ProviderError, ProviderResult, Resource};
use crate::Diagnostics;
use log::{debug, info};
use rhcs_model::Configuration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An operation requested by the host on a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create { plan: Value },
    Read { state: Value },
    Update { state: Value, plan: Value },
    Delete { state: Value },
    Import { id: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Read { .. } => "read",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::Import { .. } => "import",
        }
    }
}

/// The outcome of an operation: the state the host should store, `None` meaning the object is
/// gone, and the diagnostics for the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

/// A [`Resource`] operating on JSON documents.
#[async_trait::async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;
    async fn create(&self, plan: Value, diags: &mut Diagnostics) -> Option<Value>;
    async fn read(&self, state: Value, diags: &mut Diagnostics) -> Option<Value>;
    async fn update(&self, state: Value, plan: Value, diags: &mut Diagnostics) -> Option<Value>;
    /// Returns the state to keep, which is the unchanged state when the deletion failed.
    async fn delete(&self, state: Value, diags: &mut Diagnostics) -> Option<Value>;
    async fn import(&self, id: &str, diags: &mut Diagnostics) -> Option<Value>;
}

/// A [`DataSource`] operating on JSON documents.
#[async_trait::async_trait]
pub trait DynDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    async fn read(&self, config: Value, diags: &mut Diagnostics) -> Option<Value>;
}

fn decode<T: Configuration>(value: Value, diags: &mut Diagnostics) -> Option<T> {
    match T::from_value(value) {
        Ok(typed) => Some(typed),
        Err(e) => {
            diags.add_error("Unable to read the configuration", e.to_string());
            None
        }
    }
}

fn encode<T: Configuration>(result: ProviderResult<T>, diags: &mut Diagnostics) -> Option<Value> {
    match result {
        Ok(typed) => match typed.into_value() {
            Ok(value) => Some(value),
            Err(e) => {
                diags.add_error("Unable to write the state", e.to_string());
                None
            }
        },
        Err(e) => {
            diags.push_error(&e);
            None
        }
    }
}

#[async_trait::async_trait]
impl<R> DynResource for R
where
    R: Resource,
{
    fn type_name(&self) -> &'static str {
        Resource::type_name(self)
    }

    async fn create(&self, plan: Value, diags: &mut Diagnostics) -> Option<Value> {
        let plan = decode::<R::State>(plan, diags)?;
        let result = Resource::create(self, plan, diags).await;
        encode(result, diags)
    }

    async fn read(&self, state: Value, diags: &mut Diagnostics) -> Option<Value> {
        let previous = state.clone();
        let state = decode::<R::State>(state, diags)?;
        match Resource::read(self, state, diags).await {
            Ok(Some(state)) => encode(Ok(state), diags),
            Ok(None) => None,
            Err(e) => {
                diags.push_error(&e);
                Some(previous)
            }
        }
    }

    async fn update(&self, state: Value, plan: Value, diags: &mut Diagnostics) -> Option<Value> {
        let previous = state.clone();
        let state = decode::<R::State>(state, diags)?;
        let plan = decode::<R::State>(plan, diags)?;
        match Resource::update(self, state, plan, diags).await {
            Ok(state) => encode(Ok(state), diags),
            Err(e) => {
                diags.push_error(&e);
                Some(previous)
            }
        }
    }

    async fn delete(&self, state: Value, diags: &mut Diagnostics) -> Option<Value> {
        let previous = state.clone();
        let state = decode::<R::State>(state, diags)?;
        match Resource::delete(self, state, diags).await {
            Ok(()) => None,
            Err(e) => {
                diags.push_error(&e);
                Some(previous)
            }
        }
    }

    async fn import(&self, id: &str, diags: &mut Diagnostics) -> Option<Value> {
        let state = match Resource::import(self, id, diags).await {
            Ok(state) => state,
            Err(e) => {
                diags.push_error(&e);
                return None;
            }
        };
        match Resource::read(self, state, diags).await {
            Ok(Some(state)) => encode(Ok(state), diags),
            Ok(None) => {
                diags.add_error(
                    "Cannot import non-existent remote object",
                    format!("No remote object was found for import identifier '{}'", id),
                );
                None
            }
            Err(e) => encode::<R::State>(Err(e), diags),
        }
    }
}

#[async_trait::async_trait]
impl<D> DynDataSource for D
where
    D: DataSource,
{
    fn type_name(&self) -> &'static str {
        DataSource::type_name(self)
    }

    async fn read(&self, config: Value, diags: &mut Diagnostics) -> Option<Value> {
        let config = decode::<D::State>(config, diags)?;
        let result = DataSource::read(self, config, diags).await;
        encode(result, diags)
    }
}

/// All the resources and data sources offered by the provider, by type name.
#[derive(Default)]
pub struct Registry {
    resources: BTreeMap<&'static str, Box<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DynDataSource>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource<R>(mut self, resource: R) -> Self
    where
        R: Resource + 'static,
    {
        let resource: Box<dyn DynResource> = Box::new(resource);
        self.resources.insert(resource.type_name(), resource);
        self
    }

    pub fn with_data_source<D>(mut self, data_source: D) -> Self
    where
        D: DataSource + 'static,
    {
        let data_source: Box<dyn DynDataSource> = Box::new(data_source);
        self.data_sources
            .insert(data_source.type_name(), data_source);
        self
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn resource(&self, type_name: &str) -> ProviderResult<&dyn DynResource> {
        self.resources
            .get(type_name)
            .map(|resource| resource.as_ref())
            .ok_or_else(|| unknown_type("resource", type_name))
    }

    pub fn data_source(&self, type_name: &str) -> ProviderResult<&dyn DynDataSource> {
        self.data_sources
            .get(type_name)
            .map(|data_source| data_source.as_ref())
            .ok_or_else(|| unknown_type("data source", type_name))
    }

    /// Run `operation` on the resource registered as `type_name`.
    pub async fn apply(&self, type_name: &str, operation: Operation) -> ProviderResult<Response> {
        let resource = self.resource(type_name)?;
        info!("Running {} on resource '{}'", operation.name(), type_name);
        let mut diagnostics = Diagnostics::new();
        let state = match operation {
            Operation::Create { plan } => resource.create(plan, &mut diagnostics).await,
            Operation::Read { state } => resource.read(state, &mut diagnostics).await,
            Operation::Update { state, plan } => {
                resource.update(state, plan, &mut diagnostics).await
            }
            Operation::Delete { state } => resource.delete(state, &mut diagnostics).await,
            Operation::Import { id } => resource.import(&id, &mut diagnostics).await,
        };
        debug!(
            "Resource '{}' returned {} diagnostics",
            type_name,
            diagnostics.len()
        );
        Ok(Response { state, diagnostics })
    }

    /// Read the data source registered as `type_name`.
    pub async fn read_data(&self, type_name: &str, config: Value) -> ProviderResult<Response> {
        let data_source = self.data_source(type_name)?;
        info!("Reading data source '{}'", type_name);
        let mut diagnostics = Diagnostics::new();
        let state = data_source.read(config, &mut diagnostics).await;
        Ok(Response { state, diagnostics })
    }
}

fn unknown_type(what: &str, type_name: &str) -> ProviderError {
    ProviderError::validation(
        format!("Unknown {} type", what),
        format!("There is no {} of type '{}'", what, type_name),
    )
}
