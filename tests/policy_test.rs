//! Permission resolution across sites, subscriptions, enrollments and users

use pretty_assertions::assert_eq;
use rstest::rstest;
use zapier_authz::generations::evolve2;
use zapier_authz::security::{
    DecisionSource, PermissionId, PrincipalId, PrincipalPermissionManager, PrincipalPermissions,
    RolePermissionManager, RolePermissions, Setting, ACT_DELETE, ACT_READ, ACT_VIEW_EVENTS,
    ROLE_SITE_ADMIN,
};
use zapier_authz::store::ObjectStore;

mod common;

use common::{World, PLATFORM_ADMIN};

const ALPHA: &str = "alpha.nextthought.com";
const JANUX: &str = "janux.ou.edu";

fn two_sites() -> World {
    let mut world = World::new();
    world.add_site(ALPHA, &["site.admin"]);
    world.add_site(JANUX, &["diff.site.admin"]);
    world
}

#[test]
fn test_legacy_subscription_visible_to_platform_admin_after_evolve() {
    let mut world = two_sites();
    let subscription = world.add_legacy_subscription(ALPHA, "site.admin");
    let policy = world.policy();
    let admin = PrincipalId::from(PLATFORM_ADMIN);

    assert!(!policy.check_permission(&mut world.store, &admin, &ACT_READ, subscription));

    let summary = evolve2::evolve(&mut world.store);
    assert_eq!(summary.subscriptions_updated, 1);

    for permission in [&ACT_READ, &ACT_DELETE] {
        assert!(policy.check_permission(&mut world.store, &admin, permission, subscription));
        assert!(policy.check_permission(
            &mut world.store,
            &PrincipalId::from("site.admin"),
            permission,
            subscription
        ));
        assert!(!policy.check_permission(
            &mut world.store,
            &PrincipalId::from("diff.site.admin"),
            permission,
            subscription
        ));
    }
}

#[test]
fn test_site_admin_cannot_see_colleagues_subscription() {
    let mut world = World::new();
    world.add_site(ALPHA, &["site.admin", "other.site.admin"]);
    let subscription = world.subscribe(ALPHA, "site.admin");
    let policy = world.policy();

    let decision = policy.decide(
        &mut world.store,
        &PrincipalId::from("other.site.admin"),
        &ACT_READ,
        subscription,
    );
    assert_eq!(decision.setting, Setting::Deny);
    assert!(policy.check_permission(
        &mut world.store,
        &PrincipalId::from("site.admin"),
        &ACT_DELETE,
        subscription
    ));
}

#[rstest]
#[case("joe", true)]
#[case("site.admin", true)]
#[case(PLATFORM_ADMIN, true)]
#[case("not.joe", false)]
#[case("diff.site.admin", false)]
fn test_enrollment_record_read(#[case] principal: &str, #[case] allowed: bool) {
    let mut world = two_sites();
    let course = world.add_course(ALPHA, "Law and Justice");
    let record = world.enroll(course, Some("joe"));
    let policy = world.policy();

    assert_eq!(
        policy.check_permission(
            &mut world.store,
            &PrincipalId::from(principal),
            &ACT_READ,
            record
        ),
        allowed
    );
}

#[test]
fn test_enrollment_without_principal_only_grants_roles() {
    let mut world = two_sites();
    let course = world.add_course(ALPHA, "Law and Justice");
    let record = world.enroll(course, None);
    let policy = world.policy();

    let decision = policy.decide(
        &mut world.store,
        &PrincipalId::from(PLATFORM_ADMIN),
        &ACT_READ,
        record,
    );
    assert!(decision.is_allowed());
    assert!(matches!(decision.source, DecisionSource::Role { at, .. } if at == record));
    assert!(!policy.check_permission(
        &mut world.store,
        &PrincipalId::from("joe"),
        &ACT_READ,
        record
    ));
}

#[test]
fn test_view_events_scoped_to_admins_site() {
    let mut world = two_sites();
    let alpha_user = world.add_user(ALPHA, "not.site.admin");
    let janux_user = world.add_user(JANUX, "janux.learner");
    let policy = world.policy();
    let site_admin = PrincipalId::from("site.admin");
    let diff_site_admin = PrincipalId::from("diff.site.admin");

    let decision = policy.decide(&mut world.store, &site_admin, &ACT_VIEW_EVENTS, alpha_user);
    assert_eq!(decision.source, DecisionSource::Computed(alpha_user));
    assert!(decision.is_allowed());

    assert!(!policy.check_permission(
        &mut world.store,
        &site_admin,
        &ACT_VIEW_EVENTS,
        janux_user
    ));
    assert!(!policy.check_permission(
        &mut world.store,
        &diff_site_admin,
        &ACT_VIEW_EVENTS,
        alpha_user
    ));
    assert!(policy.check_permission(
        &mut world.store,
        &diff_site_admin,
        &ACT_VIEW_EVENTS,
        janux_user
    ));
}

#[test]
fn test_unsupported_permission_on_user_falls_through() {
    let mut world = two_sites();
    let user = world.add_user(ALPHA, "not.site.admin");
    let policy = world.policy();

    let update = PermissionId::from("nti.actions.update");
    let decision = policy.decide(
        &mut world.store,
        &PrincipalId::from("site.admin"),
        &update,
        user,
    );
    assert_eq!(decision.setting, Setting::Unset);
    assert_eq!(decision.source, DecisionSource::Default);
}

#[test]
fn test_checks_are_repeatable() {
    let mut world = two_sites();
    let course = world.add_course(ALPHA, "Law and Justice");
    let record = world.enroll(course, Some("joe"));
    let policy = world.policy();
    let joe = PrincipalId::from("joe");

    let first = policy.decide(&mut world.store, &joe, &ACT_READ, record);
    let pending_after_first = world.store.pending_changes();
    let second = policy.decide(&mut world.store, &joe, &ACT_READ, record);

    assert_eq!(first, second);
    assert_eq!(world.store.pending_changes(), pending_after_first);
}

#[test]
fn test_admin_of_two_sites_views_events_in_both() {
    let mut world = World::new();
    world.add_site(ALPHA, &["multi.admin"]);
    world.add_site(JANUX, &["multi.admin"]);
    let alpha_user = world.add_user(ALPHA, "alpha.learner");
    let janux_user = world.add_user(JANUX, "janux.learner");
    let policy = world.policy();
    let admin = PrincipalId::from("multi.admin");

    for user in [alpha_user, janux_user] {
        assert!(policy.check_permission(&mut world.store, &admin, &ACT_VIEW_EVENTS, user));
    }
}

#[test]
fn test_principal_deny_on_child_beats_site_role_allow() {
    let mut world = two_sites();
    let course = world.add_course(ALPHA, "Law and Justice");
    let admin = PrincipalId::from("site.admin");
    PrincipalPermissions::new(world.store.annotation_mut(course).unwrap())
        .deny_permission_to_principal(&ACT_READ, &admin);
    let policy = world.policy();

    let decision = policy.decide(&mut world.store, &admin, &ACT_READ, course);
    assert_eq!(decision.setting, Setting::Deny);
    assert_eq!(decision.source, DecisionSource::Principal(course));
}

#[test]
fn test_principal_deny_on_site_beats_child_role_allow() {
    let mut world = two_sites();
    let site = world.site(ALPHA);
    let course = world.add_course(ALPHA, "Law and Justice");
    let admin = PrincipalId::from("site.admin");
    PrincipalPermissions::new(world.store.annotation_mut(site).unwrap())
        .deny_permission_to_principal(&ACT_READ, &admin);
    RolePermissions::new(world.store.annotation_mut(course).unwrap())
        .grant_permission_to_role(&ACT_READ, &ROLE_SITE_ADMIN);
    let policy = world.policy();

    let decision = policy.decide(&mut world.store, &admin, &ACT_READ, course);
    assert_eq!(decision.setting, Setting::Deny);
    assert_eq!(decision.source, DecisionSource::Principal(site));
}
