use domain::ActorContext;

#[test]
fn actor_context_builds() {
    let actor = ActorContext::new("user-1", "Alice Smith", true);

    assert_eq!(actor.user_id, "user-1");
    assert_eq!(actor.display_name, "Alice Smith");
    assert!(actor.is_admin);
}

#[test]
fn default_actor_is_not_admin() {
    let actor = ActorContext::default();
    assert!(actor.user_id.is_empty());
    assert!(!actor.is_admin);
}
