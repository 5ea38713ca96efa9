use recordkv::doc;
use recordkv::errors::ErrorKind;
use recordkv::store::KvKey;
use recordkv_int_test::test_util::{cleanup, create_test_context, run_test, user};

#[test]
fn test_write_creates_one_entry_per_index() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;

            let memory = ctx.memory();
            assert_eq!(memory.len(), users.indexes().len());
            for field in users.indexes() {
                let entries = memory.entries_in(&format!("users_by_{}", field));
                assert_eq!(entries.len(), 1);
            }

            let copies: Vec<_> = users
                .indexes()
                .iter()
                .flat_map(|field| memory.entries_in(&format!("users_by_{}", field)))
                .map(|(_, record)| record)
                .collect();
            assert!(copies.windows(2).all(|pair| pair[0] == pair[1]));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_every_write_is_a_single_commit() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            let memory = ctx.memory();

            let created = users.create(&user("a@b.com", "a"))?;
            assert_eq!(memory.current_versionstamp(), 1);
            assert_eq!(created.versionstamp, Some(1));

            let updated = users
                .update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })?
                .unwrap();
            assert_eq!(memory.current_versionstamp(), 2);
            assert_eq!(updated.versionstamp, Some(2));

            let found = users.find_one(&doc! { email: "c@d.com" })?.unwrap();
            let entries = ctx.store().get_many(&[
                KvKey::new("users_by_email", "c@d.com"),
                KvKey::new("users_by_username", "a"),
                KvKey::new("users_by_id", found.id().unwrap()),
            ])?;
            assert!(entries.iter().all(|entry| entry.versionstamp() == Some(2)));

            let deleted = users.delete_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(deleted.versionstamp, Some(3));
            assert_eq!(memory.current_versionstamp(), 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_erase_removes_every_entry() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            users.create(&user("b@b.com", "b"))?;
            assert_eq!(ctx.memory().len(), 6);

            users.delete_one(&doc! { email: "a@b.com" })?;
            assert_eq!(ctx.memory().len(), 3);
            for field in users.indexes() {
                assert_eq!(ctx.memory().namespace_len(&format!("users_by_{}", field)), 1);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_optional_index_field_without_value_is_not_indexed() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users_with(|builder| builder.index("firstname"))?;
            users.create(&user("a@b.com", "a"))?;
            assert_eq!(ctx.memory().namespace_len("users_by_firstname"), 0);
            assert_eq!(ctx.memory().len(), 3);

            users.update_one(&doc! { username: "a" }, &doc! { firstname: "Ada" })?;
            assert_eq!(ctx.memory().namespace_len("users_by_firstname"), 1);
            assert!(users.find_one(&doc! { firstname: "Ada" })?.is_some());

            users.delete_one(&doc! { firstname: "Ada" })?;
            assert!(ctx.memory().is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_store_fails_every_operation() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            ctx.store().close()?;

            let err = users.create(&user("b@b.com", "b")).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            let err = users.find_one(&doc! { username: "a" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            let err = users.delete_one(&doc! { username: "a" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            Ok(())
        },
        |_| Ok(()),
    )
}
