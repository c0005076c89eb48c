mod concurrency_test;
mod engine_test;
mod failure_test;
mod flush_test;
mod planner_test;
