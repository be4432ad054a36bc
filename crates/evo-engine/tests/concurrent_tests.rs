//! Concurrent strategy: dependency gating, selective context, failure isolation

use evo_core::{ExecutionMode, StageOutput, Task};
use evo_engine::{Crew, FullHistoryContext, MemorySink, TaskStatus};
use evo_test_utils::{linear_chain, replying_agents, test_agent, test_config, CallLog};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn concurrent_crew(sink: Arc<MemorySink>) -> Crew {
    Crew::new(ExecutionMode::Concurrent, &test_config())
        .unwrap()
        .with_sink(sink)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependent_starts_after_dependency_completes() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()));
    crew.add_agent(
        "x",
        test_agent("x", calls.sleeping("x", "ok-x", Duration::from_millis(200))),
    )
    .unwrap();
    crew.add_agent("y", test_agent("y", calls.replying("y", "ok-y")))
        .unwrap();
    // dependent registered first so it is spawned first
    crew.add_task("y", Task::new("do y", "y").depends_on("x")).unwrap();
    crew.add_task("x", Task::new("do x", "x")).unwrap();

    let report = crew.run(IndexMap::new()).await.unwrap();

    let x = calls.call("x").unwrap();
    let y = calls.call("y").unwrap();
    assert!(y.started >= x.finished);
    assert!(x.finished.duration_since(x.started) >= Duration::from_millis(200));
    assert_eq!(report.get("y"), Some(&StageOutput::from("ok-y")));
}

#[tokio::test]
async fn independent_tasks_overlap() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()));
    for id in ["a", "b", "c"] {
        let model = calls.sleeping(id, &format!("ok-{id}"), Duration::from_millis(150));
        crew.add_agent(id, test_agent(id, model)).unwrap();
        crew.add_task(id, Task::new(format!("do {id}"), id)).unwrap();
    }

    let report = crew.run(IndexMap::new()).await.unwrap();

    // three sequential sleeps would take at least 450ms
    assert!(report.elapsed_secs < 0.4, "took {}s", report.elapsed_secs);
    assert_eq!(report.results.len(), 3);
}

#[tokio::test]
async fn context_holds_declared_dependencies_only() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()));
    for (id, agent) in replying_agents(&["a", "b", "c"], &calls) {
        crew.add_agent(id, agent).unwrap();
    }
    for (id, task) in linear_chain(&["a", "b", "c"]) {
        crew.add_task(id, task).unwrap();
    }

    crew.run(IndexMap::new()).await.unwrap();

    let prompt = calls.call("c").unwrap().prompt;
    assert!(prompt.contains("Context:\nb: ok-b\n"));
    assert!(!prompt.contains("a: ok-a"));
    assert!(!calls.call("a").unwrap().prompt.contains("Context:"));
}

#[tokio::test]
async fn full_history_policy_can_be_selected() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()))
        .with_context_policy(Arc::new(FullHistoryContext));
    for (id, agent) in replying_agents(&["a", "b", "c"], &calls) {
        crew.add_agent(id, agent).unwrap();
    }
    for (id, task) in linear_chain(&["a", "b", "c"]) {
        crew.add_task(id, task).unwrap();
    }

    crew.run(IndexMap::new()).await.unwrap();

    // by the time c may run, both a and b have published
    let prompt = calls.call("c").unwrap().prompt;
    assert!(prompt.contains("a: ok-a"));
    assert!(prompt.contains("b: ok-b"));
}

#[tokio::test]
async fn failing_task_still_unblocks_dependents() {
    let calls = CallLog::new();
    let sink = Arc::new(MemorySink::new());
    let mut crew = concurrent_crew(sink.clone());
    crew.add_agent("a", test_agent("a", calls.replying("a", "ok-a")))
        .unwrap();
    crew.add_agent("b", test_agent("b", calls.failing("b", "invalid api key")))
        .unwrap();
    crew.add_agent("c", test_agent("c", calls.replying("c", "ok-c")))
        .unwrap();
    for (id, task) in linear_chain(&["a", "b", "c"]) {
        crew.add_task(id, task).unwrap();
    }

    let report = crew.run(IndexMap::new()).await.unwrap();

    assert_eq!(report.get("a"), Some(&StageOutput::from("ok-a")));
    assert_eq!(report.get("c"), Some(&StageOutput::from("ok-c")));
    assert!(report
        .get("b")
        .unwrap()
        .error_message()
        .unwrap()
        .contains("invalid api key"));
    assert_eq!(crew.task_status("b"), Some(TaskStatus::Error));
    assert!(sink.get("parallel_result").is_some());
}

#[tokio::test]
async fn panicking_worker_becomes_error_output() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()));
    crew.add_agent("a", test_agent("a", calls.panicking("a", "model client bug")))
        .unwrap();
    crew.add_agent("b", test_agent("b", calls.replying("b", "ok-b")))
        .unwrap();
    for (id, task) in linear_chain(&["a", "b"]) {
        crew.add_task(id, task).unwrap();
    }

    let report = crew.run(IndexMap::new()).await.unwrap();

    let error = report.get("a").unwrap().error_message().unwrap();
    assert!(error.contains("model client bug"), "got {error}");
    assert_eq!(report.get("b"), Some(&StageOutput::from("ok-b")));
}

#[tokio::test]
async fn slow_dependency_times_out_with_typed_failure() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()))
        .with_dependency_timeout(Duration::from_millis(50));
    crew.add_agent(
        "slow",
        test_agent("slow", calls.sleeping("slow", "ok-slow", Duration::from_millis(300))),
    )
    .unwrap();
    crew.add_agent("fast", test_agent("fast", calls.replying("fast", "ok-fast")))
        .unwrap();
    crew.add_task("slow", Task::new("do slow", "slow")).unwrap();
    crew.add_task("fast", Task::new("do fast", "fast").depends_on("slow"))
        .unwrap();

    let report = crew.run(IndexMap::new()).await.unwrap();

    let error = report.get("fast").unwrap().error_message().unwrap();
    assert!(error.contains("timed out"), "got {error}");
    assert!(error.contains("slow"));
    assert!(calls.call("fast").is_none());
    assert_eq!(report.get("slow"), Some(&StageOutput::from("ok-slow")));
}

#[tokio::test]
async fn results_follow_registration_order() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()));
    // first registered finishes last
    for (id, delay) in [("first", 120), ("second", 60), ("third", 0)] {
        let model = calls.sleeping(id, "done", Duration::from_millis(delay));
        crew.add_agent(id, test_agent(id, model)).unwrap();
        crew.add_task(id, Task::new(format!("do {id}"), id)).unwrap();
    }

    let report = crew.run(IndexMap::new()).await.unwrap();

    let keys: Vec<&str> = report.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["first", "second", "third"]);
    assert!(report
        .execution_log
        .first()
        .unwrap()
        .ends_with("Starting parallel workflow"));
    assert!(report
        .execution_log
        .last()
        .unwrap()
        .contains("Parallel workflow completed in"));
}

#[tokio::test]
async fn missing_agent_publishes_error_without_blocking() {
    let calls = CallLog::new();
    let mut crew = concurrent_crew(Arc::new(MemorySink::new()));
    crew.add_agent("b", test_agent("b", calls.replying("b", "ok-b")))
        .unwrap();
    crew.add_task("a", Task::new("do a", "nobody")).unwrap();
    crew.add_task("b", Task::new("do b", "b").depends_on("a")).unwrap();

    let report = crew.run(IndexMap::new()).await.unwrap();

    assert!(report.get("a").unwrap().is_error());
    assert_eq!(crew.task_status("a"), Some(TaskStatus::Skipped));
    assert_eq!(report.get("b"), Some(&StageOutput::from("ok-b")));
}
