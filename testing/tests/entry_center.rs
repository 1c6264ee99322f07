use ob_core::{
    DepartmentCreateOptions, DepartmentUserOptions, DepartmentUserRole, EntryCenter,
    ExternalIdentity, ExternalIdentityStore, FederationError, UnionDepartment, UnionUser,
};
use testing::InMemoryEntryCenter;

fn id(raw: &str) -> ExternalIdentity {
    raw.parse().unwrap()
}

fn seeded_center() -> InMemoryEntryCenter {
    let center = InMemoryEntryCenter::new();
    center.add_user(
        "u-1",
        "Ada Lovelace",
        vec!["ada@example.com".to_string()],
        vec![id("ei.user.42@acme.github"), id("ei.user.9@corp.gitlab")],
    );
    center.add_user("u-2", "Grace Hopper", vec![], vec![id("ei.user.7@acme.github")]);
    center.add_department("d-eng", "Engineering", None, vec![id("ei.dept.5@acme.github")]);
    center.add_department("d-platform", "Platform", Some("d-eng"), vec![]);
    center
}

#[tokio::test]
async fn forward_lookup_finds_users_across_origin_platforms() {
    let center = seeded_center();

    // The same authoritative record is reachable through identities from
    // different platforms.
    let via_github = center
        .user_by_external_identity(&id("ei.user.42@acme.github"))
        .await
        .unwrap();
    let via_gitlab = center
        .user_by_external_identity(&id("ei.user.9@corp.gitlab"))
        .await
        .unwrap();
    assert_eq!(via_github.id(), "u-1");
    assert_eq!(via_gitlab.id(), "u-1");
    assert_eq!(via_github.name(), "Ada Lovelace");
    assert_eq!(via_github.email_set(), vec!["ada@example.com".to_string()]);
}

#[tokio::test]
async fn forward_lookup_misses_are_not_found() {
    let center = seeded_center();
    let err = center
        .user_by_external_identity(&id("ei.user.404@acme.github"))
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::NotFound { .. }));

    let err = center
        .department_by_external_identity(&id("ei.dept.404@acme.github"))
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::NotFound { .. }));
}

#[tokio::test]
async fn set_external_identities_writes_through() {
    let center = seeded_center();
    let mut entry = center
        .user_by_external_identity(&id("ei.user.7@acme.github"))
        .await
        .unwrap();

    entry
        .set_external_identities(vec![
            id("ei.user.7@acme.github"),
            id("ei.user.77@corp.gitlab"),
        ])
        .await
        .unwrap();

    // The new identity resolves on a fresh lookup; views are write-through.
    let refetched = center
        .user_by_external_identity(&id("ei.user.77@corp.gitlab"))
        .await
        .unwrap();
    assert_eq!(refetched.id(), "u-2");
    assert_eq!(refetched.external_identities().len(), 2);
}

#[tokio::test]
async fn department_tree_and_membership() {
    let center = seeded_center();
    let eng = center
        .department_by_external_identity(&id("ei.dept.5@acme.github"))
        .await
        .unwrap();
    assert_eq!(eng.name(), "Engineering");

    let children = eng.child_departments().await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "Platform");

    let created = eng
        .create_sub_department(DepartmentCreateOptions {
            name: "Infra".to_string(),
            description: None,
        })
        .await
        .unwrap();
    assert_eq!(created.name(), "Infra");
    assert_eq!(eng.child_departments().await.unwrap().len(), 2);

    let opts = DepartmentUserOptions {
        role: DepartmentUserRole::Admin,
    };
    eng.add_member(opts, &id("ei.user.42@acme.github"))
        .await
        .unwrap();
    let members = eng.users().await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id(), "u-1");

    eng.remove_member(opts, &id("ei.user.9@corp.gitlab"))
        .await
        .unwrap();
    assert!(eng.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn membership_requires_a_known_user() {
    let center = seeded_center();
    let eng = center
        .department_by_external_identity(&id("ei.dept.5@acme.github"))
        .await
        .unwrap();
    let err = eng
        .add_member(
            DepartmentUserOptions {
                role: DepartmentUserRole::Member,
            },
            &id("ei.user.404@acme.github"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::NotFound { .. }));
}
