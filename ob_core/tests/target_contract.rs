//! Target contract behavior driven through the in-memory fake adapter.

use ob_core::{
    DepartmentUserOptions, DepartmentUserRole, ExternalIdentity, FederationError, Target,
    TargetEntry, TargetRegistry, UnionDepartment, UnionUser,
};
use std::sync::Arc;
use testing::{FakeTarget, FakeUser};

fn id(raw: &str) -> ExternalIdentity {
    raw.parse().unwrap()
}

#[tokio::test]
async fn all_users_concatenates_uneven_pages_in_order() {
    let pages = vec![
        vec![FakeUser::new("1", "a"), FakeUser::new("2", "b")],
        vec![FakeUser::new("3", "c")],
        vec![],
        vec![
            FakeUser::new("4", "d"),
            FakeUser::new("5", "e"),
            FakeUser::new("6", "f"),
        ],
    ];
    let target = FakeTarget::builder("github", "acme", "Acme")
        .user_pages(pages)
        .build();

    let users = target.all_users().await.unwrap();
    let ids: Vec<String> = users.iter().map(|u| u.id()).collect();
    assert_eq!(ids, ["1", "2", "3", "4", "5", "6"]);
}

#[tokio::test]
async fn all_users_surfaces_the_first_page_error() {
    let target = FakeTarget::builder("github", "acme", "Acme")
        .user_pages(vec![
            vec![FakeUser::new("1", "a")],
            vec![FakeUser::new("2", "b")],
        ])
        .failing_users_page(2)
        .build();

    let err = target.all_users().await.unwrap_err();
    assert!(matches!(err, FederationError::Adapter { .. }));
}

#[tokio::test]
async fn endless_pages_trip_the_page_cap() {
    let target = FakeTarget::builder("github", "acme", "Acme")
        .endless_user_pages()
        .page_limit(10)
        .build();

    let err = target.all_users().await.unwrap_err();
    match err {
        FederationError::PaginationLimitExceeded { limit, .. } => assert_eq!(limit, 10),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn point_lookups_resolve_internal_identities() {
    let target = FakeTarget::builder("github", "acme", "Acme")
        .user(FakeUser::new("42", "octocat").with_email("octo@example.com"))
        .department("5", "Engineering", None)
        .build();

    let user = target
        .user_by_internal_identity(&id("ei.user.42@acme.github"))
        .await
        .unwrap();
    assert_eq!(user.id(), "42");
    assert_eq!(user.email_set(), vec!["octo@example.com".to_string()]);

    let dept = target
        .department_by_internal_identity(&id("ei.dept.5@acme.github"))
        .await
        .unwrap();
    assert_eq!(dept.id(), "5");
    assert_eq!(dept.name(), "Engineering");

    let err = target
        .user_by_internal_identity(&id("ei.user.404@acme.github"))
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::NotFound { .. }));
}

#[tokio::test]
async fn root_department_conventions() {
    let target = FakeTarget::builder("github", "acme", "Acme Corporation")
        .department("1", "Engineering", None)
        .department("2", "Platform", Some("1"))
        .department("3", "Sales", None)
        .build();

    let root = target.root_department();
    assert_eq!(root.id(), "0");
    assert_eq!(root.name(), "Acme Corporation");
    // Org membership is not root-group membership.
    assert!(root.users().await.unwrap().is_empty());

    // One level only: the nested team is not among the root's children.
    let children = root.child_departments().await.unwrap();
    let names: Vec<String> = children.iter().map(|d| d.name()).collect();
    assert_eq!(names, ["Engineering", "Sales"]);
}

#[tokio::test]
async fn root_membership_mutations_fail_before_any_lookup() {
    // No users exist anywhere: if the root check ran after the user
    // resolution, these would surface NotFound instead.
    let target = FakeTarget::builder("github", "acme", "Acme").build();
    let root = target.root_department();
    let opts = DepartmentUserOptions {
        role: DepartmentUserRole::Member,
    };
    let ext_id = id("ei.user.42@acme.github");
    for err in [
        root.add_member(opts, &ext_id).await.unwrap_err(),
        root.remove_member(opts, &ext_id).await.unwrap_err(),
    ] {
        match err {
            FederationError::Adapter { source, .. } => {
                assert!(source.to_string().contains("no backing team"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[tokio::test]
async fn role_mapping_is_fail_closed() {
    let target = FakeTarget::builder("github", "acme", "Acme")
        .user(FakeUser::new("42", "octocat"))
        .department("5", "Engineering", None)
        .build();
    let dept = target
        .department_by_internal_identity(&id("ei.dept.5@acme.github"))
        .await
        .unwrap();

    // The fake's table maps Member and deliberately lacks Admin: every role
    // either maps or fails UnmappedRole, no third outcome.
    dept.add_member(
        DepartmentUserOptions {
            role: DepartmentUserRole::Member,
        },
        &id("ei.user.42@acme.github"),
    )
    .await
    .unwrap();
    assert_eq!(target.members_of("5").len(), 1);

    let err = dept
        .add_member(
            DepartmentUserOptions {
                role: DepartmentUserRole::Admin,
            },
            &id("ei.user.42@acme.github"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::UnmappedRole { .. }));
}

#[tokio::test]
async fn foreign_identities_are_rejected_before_resolution() {
    let target = FakeTarget::builder("github", "acme", "Acme")
        .department("5", "Engineering", None)
        .build();
    let dept = target
        .department_by_internal_identity(&id("ei.dept.5@acme.github"))
        .await
        .unwrap();

    let opts = DepartmentUserOptions {
        role: DepartmentUserRole::Member,
    };
    // "42" exists nowhere; a foreign identity must fail the internality
    // check, not the user lookup.
    for foreign in ["ei.user.42@other.github", "ei.user.42@acme.gitlab"] {
        let err = dept.add_member(opts, &id(foreign)).await.unwrap_err();
        assert!(matches!(err, FederationError::ForeignIdentity { .. }));
        let err = dept.remove_member(opts, &id(foreign)).await.unwrap_err();
        assert!(matches!(err, FederationError::ForeignIdentity { .. }));
    }
    assert!(target.members_of("5").is_empty());
}

#[tokio::test]
async fn registry_resolves_configured_targets_only() {
    let mut registry = TargetRegistry::new();
    let acme = FakeTarget::builder("github", "acme", "Acme").build();
    let corp = FakeTarget::builder("gitlab", "corp", "Corp").build();
    registry.register(Arc::new(acme.clone())).unwrap();
    registry.register(Arc::new(corp)).unwrap();
    assert_eq!(registry.len(), 2);

    let resolved = registry.resolve(&id("ei.user.1@acme.github")).unwrap();
    assert_eq!(resolved.slug(), "acme");

    let err = registry.resolve(&id("ei.user.1@acme.bitbucket")).unwrap_err();
    assert!(matches!(err, FederationError::TargetNotFound { .. }));

    let err = registry.register(Arc::new(acme)).unwrap_err();
    assert!(matches!(err, FederationError::Configuration { .. }));
}
