use recordkv::collection::CollectionBuilder;
use recordkv::common::Value;
use recordkv::doc;
use recordkv::record::Document;
use recordkv_int_test::test_util::{
    cleanup, create_test_context, insert_test_users, run_test, user, users_shape,
};

#[test]
fn test_create_and_find_by_every_index() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            let result = users.create(&doc! {
                email: "a@b.com",
                username: "a",
                password: "azeazeaze",
            })?;
            assert!(result.ok);
            assert!(result.versionstamp.is_some());

            let by_email = users.find_one(&doc! { email: "a@b.com" })?.unwrap();
            let by_username = users.find_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(by_email, by_username);

            let id = by_email.id().unwrap();
            assert!(uuid::Uuid::parse_str(id).is_ok());
            assert_eq!(users.find_by_id(id)?, Some(by_email.clone()));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_round_trip_adds_only_system_fields() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            let input = doc! {
                email: "a@b.com",
                username: "a",
                password: "azeazeaze",
                firstname: "Ada",
                activated: true,
            };
            users.create(&input)?;

            let mut found = users.find_one(&doc! { username: "a" })?.unwrap();
            assert!(found.remove("id").is_some());
            assert!(found.remove("createdAt").is_some());
            assert!(found.remove("updatedAt").is_some());
            assert_eq!(found, input);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_by_combined_query_uses_any_index() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            insert_test_users(&users)?;

            let found = users
                .find_one(&doc! { email: "nobody@b.com", username: "b" })?
                .unwrap();
            assert_eq!(found.get("email"), Some(&Value::from("b@b.com")));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_by_username_changes_email() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;

            let result = users.update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })?;
            assert!(result.unwrap().ok);

            let found = users.find_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(found.get("email"), Some(&Value::from("c@d.com")));
            assert_eq!(users.find_one(&doc! { email: "c@d.com" })?, Some(found));
            assert_eq!(users.find_one(&doc! { email: "a@b.com" })?, None);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_keeps_identity_and_advances_timestamp() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            let created = users.find_one(&doc! { username: "a" })?.unwrap();
            let id = created.id().unwrap().to_string();

            let mut previous = created.clone();
            for name in ["Ada", "Grace", "Barbara"] {
                users.update_by_id(&id, &doc! { firstname: (name) })?;
                let current = users.find_by_id(&id)?.unwrap();
                assert_eq!(current.id(), Some(id.as_str()));
                assert_eq!(current.created_at(), created.created_at());
                assert!(current.updated_at() > previous.updated_at());
                assert_eq!(current.get("firstname"), Some(&Value::from(name)));
                previous = current;
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_merges_patch_into_record() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            users.create(&user("a@b.com", "a"))?;
            users.update_one(&doc! { username: "a" }, &doc! { firstname: "Ada" })?;
            users.update_one(&doc! { username: "a" }, &doc! { lastname: "Lovelace" })?;

            let found = users.find_one(&doc! { email: "a@b.com" })?.unwrap();
            assert_eq!(found.get("firstname"), Some(&Value::from("Ada")));
            assert_eq!(found.get("lastname"), Some(&Value::from("Lovelace")));
            assert_eq!(found.get("password"), Some(&Value::from("correct-horse")));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete_by_username() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            insert_test_users(&users)?;

            let result = users.delete_one(&doc! { username: "a" })?;
            assert!(result.unwrap().ok);
            assert_eq!(users.find_one(&doc! { username: "a" })?, None);
            assert_eq!(users.find_one(&doc! { email: "a@b.com" })?, None);
            assert!(users.find_one(&doc! { username: "b" })?.is_some());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_operations_on_missing_records_return_none() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            insert_test_users(&users)?;
            let missing_id = uuid::Uuid::new_v4().to_string();

            assert_eq!(users.find_by_id(&missing_id)?, None);
            assert_eq!(users.update_by_id(&missing_id, &doc! { firstname: "x" })?, None);
            assert_eq!(users.delete_by_id(&missing_id)?, None);
            assert_eq!(users.find_one(&doc! { username: "zz" })?, None);
            assert_eq!(users.update_one(&doc! { username: "zz" }, &doc! { firstname: "x" })?, None);
            assert_eq!(users.delete_one(&doc! { email: "zz@b.com" })?, None);
            assert_eq!(ctx.memory().len(), 9);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_empty_query_returns_none_without_mutation() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            insert_test_users(&users)?;
            let stamp = ctx.memory().current_versionstamp();

            assert_eq!(users.find_one(&Document::new())?, None);
            assert_eq!(users.update_one(&Document::new(), &doc! { firstname: "x" })?, None);
            assert_eq!(users.delete_one(&Document::new())?, None);

            assert_eq!(ctx.memory().current_versionstamp(), stamp);
            assert_eq!(ctx.memory().len(), 9);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_collections_share_a_store_without_overlap() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            let admins = CollectionBuilder::new(ctx.store(), "admins")
                .shape(users_shape())
                .index("email")
                .build()?;

            users.create(&user("a@b.com", "a"))?;
            admins.create(&user("a@b.com", "root"))?;

            let user_a = users.find_one(&doc! { email: "a@b.com" })?.unwrap();
            let admin_a = admins.find_one(&doc! { email: "a@b.com" })?.unwrap();
            assert_ne!(user_a.id(), admin_a.id());
            assert_eq!(admin_a.get("username"), Some(&Value::from("root")));
            assert_eq!(ctx.memory().namespace_len("admins_by_email"), 1);
            assert_eq!(ctx.store().collection_names(), vec!["admins", "users"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
