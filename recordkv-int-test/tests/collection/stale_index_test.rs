use recordkv::common::Value;
use recordkv::doc;
use recordkv_int_test::test_util::{cleanup, create_test_context, run_test, user};

#[test]
fn test_changed_index_value_removes_old_entry() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            users.update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })?;

            assert_eq!(users.find_one(&doc! { email: "a@b.com" })?, None);
            let emails = ctx.memory().entries_in("users_by_email");
            assert_eq!(emails.len(), 1);
            assert_eq!(emails[0].0.value(), "c@d.com");
            assert_eq!(ctx.memory().len(), 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_changing_several_index_values_at_once() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            users.update_one(
                &doc! { email: "a@b.com" },
                &doc! { email: "c@d.com", username: "c" },
            )?;

            assert_eq!(users.find_one(&doc! { username: "a" })?, None);
            assert_eq!(users.find_one(&doc! { email: "a@b.com" })?, None);
            let by_username = users.find_one(&doc! { username: "c" })?.unwrap();
            let by_email = users.find_one(&doc! { email: "c@d.com" })?.unwrap();
            assert_eq!(by_username, by_email);
            assert_eq!(ctx.memory().len(), 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_freed_index_value_can_be_reused() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            users.update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })?;
            users.create(&user("a@b.com", "b"))?;

            let found = users.find_one(&doc! { email: "a@b.com" })?.unwrap();
            assert_eq!(found.get("username"), Some(&Value::from("b")));
            assert_eq!(ctx.memory().len(), 6);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_without_cleanup_old_entry_keeps_previous_version() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users_with(|builder| builder.cleanup_stale_indexes(false))?;
            users.create(&user("a@b.com", "a"))?;
            users.update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })?;

            let current = users.find_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(current.get("email"), Some(&Value::from("c@d.com")));

            let stale = users.find_one(&doc! { email: "a@b.com" })?.unwrap();
            assert_eq!(stale.id(), current.id());
            assert_eq!(stale.get("email"), Some(&Value::from("a@b.com")));
            assert!(stale.updated_at() < current.updated_at());
            assert_eq!(ctx.memory().namespace_len("users_by_email"), 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_without_cleanup_delete_leaves_stale_entry() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users_with(|builder| builder.cleanup_stale_indexes(false))?;
            users.create(&user("a@b.com", "a"))?;
            users.update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })?;
            users.delete_one(&doc! { username: "a" })?;

            assert_eq!(users.find_one(&doc! { username: "a" })?, None);
            assert_eq!(users.find_one(&doc! { email: "c@d.com" })?, None);
            assert!(users.find_one(&doc! { email: "a@b.com" })?.is_some());
            assert_eq!(ctx.memory().len(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
