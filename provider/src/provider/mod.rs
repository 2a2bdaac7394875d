mod error;

pub use self::error::{ErrorKind, IntoProviderError, ProviderError, ProviderResult};
use crate::Diagnostics;
use rhcs_model::Configuration;

/// You implement the [`Resource`] trait for each kind of remote object the provider manages. The
/// host hands each operation the documents it knows about (the planned state, the prior state, or
/// both) and stores whatever the operation returns as the new state.
///
/// ## Custom Types
///
/// - `State` mirrors the resource schema. It is used for the plan as well as for the state, so
///   every computed field must be optional.
///
/// ## Diagnostics
///
/// Returning `Err` tells the host that the operation failed and that no new state was produced.
/// When an operation has changed the remote object but fails afterwards, for example a cluster was
/// created but did not become ready in time, push an error to `diags` and return the new state so
/// that the object is not forgotten. Warnings always go to `diags`.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    type State: Configuration;

    /// The type name registered with the host, e.g. `rhcs_machine_pool`.
    fn type_name(&self) -> &'static str;

    /// Create the remote object described by `plan`.
    async fn create(&self, plan: Self::State, diags: &mut Diagnostics)
        -> ProviderResult<Self::State>;

    /// Refresh `state` from the API. `None` means the remote object no longer exists and must be
    /// removed from the state.
    async fn read(
        &self,
        state: Self::State,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>>;

    /// Change the remote object from `state` to `plan` in place.
    async fn update(
        &self,
        state: Self::State,
        plan: Self::State,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Self::State>;

    /// Delete the remote object.
    async fn delete(&self, state: Self::State, diags: &mut Diagnostics) -> ProviderResult<()>;

    /// Build the state of an existing remote object from an import identifier. The returned state
    /// is refreshed with [`Resource::read`] by the host afterwards.
    async fn import(&self, id: &str, _diags: &mut Diagnostics) -> ProviderResult<Self::State> {
        Err(ProviderError::validation(
            "Import is not supported",
            format!(
                "Resources of type '{}' cannot be imported, '{}' was given",
                self.type_name(),
                id
            ),
        ))
    }
}

/// You implement the [`DataSource`] trait for read-only lookups. `config` carries the user's
/// arguments; the returned value is the same document with the computed attributes filled in.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    type State: Configuration;

    /// The type name registered with the host, e.g. `rhcs_versions`.
    fn type_name(&self) -> &'static str;

    async fn read(&self, config: Self::State, diags: &mut Diagnostics)
        -> ProviderResult<Self::State>;
}

/// Reject an update that changes an attribute which cannot be changed in place.
pub fn ensure_unchanged<T>(attribute: &str, state: &T, plan: &T) -> ProviderResult<()>
where
    T: PartialEq + std::fmt::Debug,
{
    if state == plan {
        return Ok(());
    }
    Err(ProviderError::validation(
        "Attribute value cannot be changed",
        format!(
            "Attribute {} cannot be changed from {:?} to {:?}, the resource must be replaced",
            attribute, state, plan
        ),
    ))
}

/// Shorthand to reject an update on resources that only support replacement.
pub fn update_not_supported<T>(type_name: &str) -> ProviderResult<T> {
    Err(ProviderError::validation(
        "Update is currently not supported.",
        format!("Resources of type '{}' must be replaced to change them", type_name),
    ))
}
