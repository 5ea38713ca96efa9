use recordkv::common::Value;
use recordkv::doc;
use recordkv::store::KvStore;
use recordkv_int_test::test_util::{
    cleanup, create_test_context, run_test, user, users_on, InterleavingKvStore,
};
use std::thread;

#[test]
fn test_lost_update_without_optimistic_concurrency() {
    run_test(
        || create_test_context(),
        |ctx| {
            let interleaving = InterleavingKvStore::new(ctx.memory().clone());
            let racing = users_on(KvStore::new(interleaving.clone()), |builder| builder)?;
            let other = ctx.users()?;
            other.create(&user("a@b.com", "a"))?;

            let concurrent = other.clone();
            interleaving.after_next_read(move || {
                let result = concurrent
                    .update_one(&doc! { username: "a" }, &doc! { lastname: "Lovelace" })
                    .unwrap()
                    .unwrap();
                assert!(result.ok);
            });

            let result = racing
                .update_one(&doc! { username: "a" }, &doc! { firstname: "Ada" })?
                .unwrap();
            assert!(result.ok);

            let stored = other.find_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(stored.get("firstname"), Some(&Value::from("Ada")));
            assert_eq!(stored.get("lastname"), None);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_optimistic_concurrency_refuses_stale_update() {
    run_test(
        || create_test_context(),
        |ctx| {
            let interleaving = InterleavingKvStore::new(ctx.memory().clone());
            let racing = users_on(KvStore::new(interleaving.clone()), |builder| {
                builder.optimistic_concurrency(true)
            })?;
            let other = ctx.users()?;
            other.create(&user("a@b.com", "a"))?;

            let concurrent = other.clone();
            interleaving.after_next_read(move || {
                concurrent
                    .update_one(&doc! { username: "a" }, &doc! { lastname: "Lovelace" })
                    .unwrap();
            });

            let stamp_before = ctx.memory().current_versionstamp();
            let result = racing
                .update_one(&doc! { username: "a" }, &doc! { firstname: "Ada" })?
                .unwrap();
            assert!(!result.ok);
            assert_eq!(result.versionstamp, None);
            assert_eq!(ctx.memory().current_versionstamp(), stamp_before + 1);

            let stored = other.find_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(stored.get("firstname"), None);
            assert_eq!(stored.get("lastname"), Some(&Value::from("Lovelace")));

            // retrying the whole operation sees the concurrent write
            let retried = racing
                .update_one(&doc! { username: "a" }, &doc! { firstname: "Ada" })?
                .unwrap();
            assert!(retried.ok);
            let stored = other.find_one(&doc! { username: "a" })?.unwrap();
            assert_eq!(stored.get("firstname"), Some(&Value::from("Ada")));
            assert_eq!(stored.get("lastname"), Some(&Value::from("Lovelace")));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_optimistic_concurrency_refuses_stale_delete() {
    run_test(
        || create_test_context(),
        |ctx| {
            let interleaving = InterleavingKvStore::new(ctx.memory().clone());
            let racing = users_on(KvStore::new(interleaving.clone()), |builder| {
                builder.optimistic_concurrency(true)
            })?;
            let other = ctx.users()?;
            other.create(&user("a@b.com", "a"))?;

            let concurrent = other.clone();
            interleaving.after_next_read(move || {
                concurrent
                    .update_one(&doc! { username: "a" }, &doc! { email: "c@d.com" })
                    .unwrap();
            });

            let result = racing.delete_one(&doc! { username: "a" })?.unwrap();
            assert!(!result.ok);
            assert!(other.find_one(&doc! { email: "c@d.com" })?.is_some());
            assert_eq!(ctx.memory().len(), 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_optimistic_concurrency_without_contention() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users_with(|builder| builder.optimistic_concurrency(true))?;
            assert!(users.create(&user("a@b.com", "a"))?.ok);
            let updated = users
                .update_one(&doc! { email: "a@b.com" }, &doc! { firstname: "Ada" })?
                .unwrap();
            assert!(updated.ok);
            let deleted = users.delete_one(&doc! { username: "a" })?.unwrap();
            assert!(deleted.ok);
            assert!(ctx.memory().is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_concurrent_creates_keep_indexes_consistent() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            let threads = 8;
            let per_thread = 25;

            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let users = users.clone();
                    thread::spawn(move || {
                        for i in 0..per_thread {
                            let name = format!("user{}x{}", t, i);
                            let result = users
                                .create(&user(&format!("{}@b.com", name), &name))
                                .unwrap();
                            assert!(result.ok);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let total = threads * per_thread;
            assert_eq!(ctx.memory().namespace_len("users_by_email"), total);
            assert_eq!(ctx.memory().namespace_len("users_by_username"), total);
            assert_eq!(ctx.memory().namespace_len("users_by_id"), total);
            assert_eq!(ctx.memory().current_versionstamp(), total as u64);

            for (_, record) in ctx.memory().entries_in("users_by_username") {
                let by_email = users
                    .find_one(&doc! { email: (record.get("email").cloned().unwrap()) })?
                    .unwrap();
                assert_eq!(by_email, record);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_concurrent_updates_of_distinct_records() {
    run_test(
        || create_test_context(),
        |ctx| {
            let users = ctx.users()?;
            for i in 0..8 {
                users.create(&user(&format!("u{}@b.com", i), &format!("u{}", i)))?;
            }

            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let users = users.clone();
                    thread::spawn(move || {
                        let username = format!("u{}", i);
                        let email = format!("moved{}@b.com", i);
                        users
                            .update_one(&doc! { username: (username) }, &doc! { email: (email) })
                            .unwrap()
                            .unwrap()
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().ok);
            }

            assert_eq!(ctx.memory().len(), 24);
            for i in 0..8 {
                let found = users
                    .find_one(&doc! { email: (format!("moved{}@b.com", i)) })?
                    .unwrap();
                assert_eq!(found.get("username"), Some(&Value::from(format!("u{}", i))));
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
