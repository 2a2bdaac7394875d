mod mock;

use mock::MockOcm;
use rhcs_model::ClusterState;
use rhcs_provider::provider::{ErrorKind, Resource};
use rhcs_provider::Diagnostics;
use rhcs_resources::identity_provider::{
    GithubState, HtpasswdState, HtpasswdUserState, IdentityProviderResource, IdentityProviderState,
};
use std::sync::Arc;

const PASSWORD: &str = "Sup3r-Secret-Password";

fn client() -> Arc<MockOcm> {
    Arc::new(MockOcm::new().with_cluster("c1", ClusterState::Ready))
}

fn htpasswd(name: &str) -> IdentityProviderState {
    IdentityProviderState {
        cluster: "c1".to_string(),
        name: name.to_string(),
        htpasswd: Some(HtpasswdState {
            users: vec![HtpasswdUserState {
                username: "alice".to_string(),
                password: PASSWORD.to_string(),
            }],
        }),
        ..IdentityProviderState::default()
    }
}

#[tokio::test(start_paused = true)]
async fn create_keeps_passwords() {
    let client = client();
    let resource = IdentityProviderResource::new(Arc::clone(&client));
    let state = resource
        .create(htpasswd("local"), &mut Diagnostics::new())
        .await
        .unwrap();
    assert_eq!(state.id.as_deref(), Some("idp-1"));
    assert_eq!(state.mapping_method.as_deref(), Some("claim"));
    assert_eq!(state.htpasswd.as_ref().unwrap().users[0].password, PASSWORD);

    let read = resource
        .read(state.clone(), &mut Diagnostics::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, state);
}

#[tokio::test(start_paused = true)]
async fn invalid_plan_is_not_sent() {
    let client = client();
    let resource = IdentityProviderResource::new(Arc::clone(&client));
    let mut plan = htpasswd("local");
    plan.github = Some(GithubState {
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        organizations: Some(vec!["my-org".to_string()]),
        ..GithubState::default()
    });
    let e = resource
        .create(plan, &mut Diagnostics::new())
        .await
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Validation);
    assert_eq!(client.count("create_identity_provider"), 0);
}

#[tokio::test(start_paused = true)]
async fn cluster_in_error_blocks_creation() {
    let client = Arc::new(MockOcm::new().with_cluster("c1", ClusterState::Error));
    let resource = IdentityProviderResource::new(Arc::clone(&client));
    let e = resource
        .create(htpasswd("local"), &mut Diagnostics::new())
        .await
        .unwrap_err();
    assert_eq!(e.context(), Some("Can't poll cluster state"));
}

#[tokio::test(start_paused = true)]
async fn update_is_refused() {
    let client = client();
    let resource = IdentityProviderResource::new(Arc::clone(&client));
    let e = resource
        .update(htpasswd("a"), htpasswd("b"), &mut Diagnostics::new())
        .await
        .unwrap_err();
    assert_eq!(e.context(), Some("IDP Update not supported."));
}

#[tokio::test(start_paused = true)]
async fn import_by_name() {
    let client = client();
    let resource = IdentityProviderResource::new(Arc::clone(&client));
    resource
        .create(htpasswd("local"), &mut Diagnostics::new())
        .await
        .unwrap();

    let mut diags = Diagnostics::new();
    let imported = resource.import("c1,local", &mut diags).await.unwrap();
    assert_eq!(imported.id.as_deref(), Some("idp-1"));
    let state = resource.read(imported, &mut diags).await.unwrap().unwrap();
    let users = &state.htpasswd.unwrap().users;
    assert_eq!(users[0].username, "alice");
    assert!(users[0].password.is_empty());

    let e = resource.import("c1,other", &mut diags).await.unwrap_err();
    assert!(e.to_string().contains("identity provider 'other' not found"));
}

#[tokio::test(start_paused = true)]
async fn delete_and_drift() {
    let client = client();
    let resource = IdentityProviderResource::new(Arc::clone(&client));
    let state = resource
        .create(htpasswd("local"), &mut Diagnostics::new())
        .await
        .unwrap();
    resource
        .delete(state.clone(), &mut Diagnostics::new())
        .await
        .unwrap();
    assert!(client.identity_providers("c1").is_empty());

    // Already gone.
    resource
        .delete(state.clone(), &mut Diagnostics::new())
        .await
        .unwrap();

    let mut diags = Diagnostics::new();
    assert!(resource.read(state, &mut diags).await.unwrap().is_none());
    assert_eq!(diags.warnings().count(), 1);
}
