use parking_lot::Mutex;
use recordkv::collection::{CollectionBuilder, RecordCollection};
use recordkv::doc;
use recordkv::errors::RecordResult;
use recordkv::record::Document;
use recordkv::schema::{FieldDescriptor, Shape};
use recordkv::store::memory::InMemoryKvStore;
use recordkv::store::{Check, CommitResult, KvEntry, KvKey, KvStore, KvStoreProvider, Mutation};
use std::backtrace::Backtrace;
use std::sync::Arc;
use std::time::Instant;

/// Runs a test between a setup and a teardown step.
///
/// `after` runs whether the test body fails or not. Errors and panics are
/// reported with the elapsed time and a backtrace before the test panics.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> RecordResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> RecordResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> RecordResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => match after(ctx) {
                    Ok(_) => Ok(()),
                    Err(e) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
                },
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let elapsed = start_time.elapsed();
    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", err_msg), Backtrace::capture().to_string())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");

    panic!("{}", error);
}

/// A fresh in-memory store shared by the collections of one test.
#[derive(Clone)]
pub struct TestContext {
    memory: InMemoryKvStore,
    store: KvStore,
}

impl TestContext {
    pub fn new(memory: InMemoryKvStore) -> Self {
        let store = KvStore::new(memory.clone());
        Self { memory, store }
    }

    /// Direct access to the backing entries, for assertions on key layout.
    pub fn memory(&self) -> &InMemoryKvStore {
        &self.memory
    }

    pub fn store(&self) -> KvStore {
        self.store.clone()
    }

    /// The `users` collection indexed by `email` and `username`.
    pub fn users(&self) -> RecordResult<RecordCollection> {
        self.users_with(|builder| builder)
    }

    /// The `users` collection with extra builder settings applied.
    pub fn users_with<F>(&self, configure: F) -> RecordResult<RecordCollection>
    where
        F: FnOnce(CollectionBuilder) -> CollectionBuilder,
    {
        users_on(self.store(), configure)
    }
}

pub fn create_test_context() -> RecordResult<TestContext> {
    Ok(TestContext::new(InMemoryKvStore::new()))
}

pub fn cleanup(ctx: TestContext) -> RecordResult<()> {
    log::debug!(
        "Closing test store with {} entries at versionstamp {}",
        ctx.memory().len(),
        ctx.memory().current_versionstamp()
    );
    ctx.store().close()
}

pub fn users_on<F>(store: KvStore, configure: F) -> RecordResult<RecordCollection>
where
    F: FnOnce(CollectionBuilder) -> CollectionBuilder,
{
    configure(
        CollectionBuilder::new(store, "users")
            .shape(users_shape())
            .indexes(&["email", "username"]),
    )
    .build()
}

pub fn users_shape() -> Shape {
    Shape::new(vec![
        FieldDescriptor::string("email").email(),
        FieldDescriptor::string("username"),
        FieldDescriptor::string("password").min(8).max(32),
        FieldDescriptor::string("firstname").optional(),
        FieldDescriptor::string("lastname").optional(),
        FieldDescriptor::boolean("activated").default(false),
    ])
}

pub fn user(email: &str, username: &str) -> Document {
    doc! {
        email: (email),
        username: (username),
        password: "correct-horse",
    }
}

/// Creates the three users `a`, `b` and `c`.
pub fn insert_test_users(users: &RecordCollection) -> RecordResult<()> {
    for name in ["a", "b", "c"] {
        let result = users.create(&user(&format!("{}@b.com", name), name))?;
        assert!(result.ok);
    }
    Ok(())
}

type Hook = Box<dyn FnOnce() + Send>;

/// A store that runs a one-shot hook after serving a multi-get.
///
/// The hook runs between the read and the commit of a read-modify-write
/// operation, which makes interleavings of concurrent writers reproducible.
#[derive(Clone)]
pub struct InterleavingKvStore {
    memory: InMemoryKvStore,
    hook: Arc<Mutex<Option<Hook>>>,
}

impl InterleavingKvStore {
    pub fn new(memory: InMemoryKvStore) -> Self {
        Self {
            memory,
            hook: Arc::new(Mutex::new(None)),
        }
    }

    /// Arms `hook` to run after the next `get_many`.
    pub fn after_next_read<F: FnOnce() + Send + 'static>(&self, hook: F) {
        *self.hook.lock() = Some(Box::new(hook));
    }
}

impl KvStoreProvider for InterleavingKvStore {
    fn get_many(&self, keys: &[KvKey]) -> RecordResult<Vec<KvEntry>> {
        let entries = self.memory.get_many(keys)?;
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            log::debug!("Running interleaved writer after reading {} key(s)", keys.len());
            hook();
        }
        Ok(entries)
    }

    fn commit(&self, checks: Vec<Check>, mutations: Vec<Mutation>) -> RecordResult<CommitResult> {
        self.memory.commit(checks, mutations)
    }

    fn close(&self) -> RecordResult<()> {
        self.memory.close()
    }

    fn is_closed(&self) -> RecordResult<bool> {
        self.memory.is_closed()
    }
}
