mod atomicity_test;
mod concurrency_test;
mod crud_test;
mod stale_index_test;
