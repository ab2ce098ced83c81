// tests/readiness.rs

use forge::errors::ForgeError;
use forge::graph::{
    find_blocked, find_ready, get_transitive_deps, group_status, group_topological_order,
    Blocker, ReqStatus,
};
use forge_test_utils::builders::{req, GraphBuilder};
use forge_test_utils::init_tracing;

#[test]
fn test_ready_after_dependency_completes() {
    init_tracing();

    let graph = GraphBuilder::new()
        .group("core", 1)
        .req("req-001", req("core").complete())
        .req("req-002", req("core").after("req-001"))
        .build();

    assert_eq!(find_ready(&graph).unwrap(), vec!["req-002".to_string()]);
}

#[test]
fn test_ready_only_returns_pending_items() {
    let graph = GraphBuilder::new()
        .group("core", 1)
        .req("a", req("core").status(ReqStatus::InProgress))
        .req("b", req("core").status(ReqStatus::Discovered))
        .req("c", req("core").status(ReqStatus::Rejected))
        .req("d", req("core").complete())
        .req("e", req("core"))
        .build();

    assert_eq!(find_ready(&graph).unwrap(), vec!["e".to_string()]);
}

#[test]
fn test_ready_orders_by_priority_then_group_then_insertion() {
    let graph = GraphBuilder::new()
        .group("late", 2)
        .group("early", 1)
        .req("late-1", req("late"))
        .req("early-1", req("early"))
        .req("early-2", req("early"))
        .req("urgent", req("late").priority(5))
        .build();

    let ready = find_ready(&graph).unwrap();
    assert_eq!(ready, vec!["urgent", "early-1", "early-2", "late-1"]);
}

#[test]
fn test_group_dependency_gates_readiness() {
    let graph = GraphBuilder::new()
        .group("foundation", 1)
        .group_after("features", 2, &["foundation"])
        .req("f-1", req("foundation").complete())
        .req("f-2", req("foundation"))
        .req("feat-1", req("features"))
        .build();

    // feat-1 has no requirement deps, but its upstream group is open.
    assert_eq!(find_ready(&graph).unwrap(), vec!["f-2".to_string()]);

    let blocked = find_blocked(&graph);
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].id, "feat-1");
    assert_eq!(blocked[0].blockers, vec![Blocker::Group("foundation".into())]);
    assert_eq!(blocked[0].blockers[0].to_string(), "group:foundation");
}

#[test]
fn test_rejected_items_do_not_hold_a_group_open() {
    let graph = GraphBuilder::new()
        .group("foundation", 1)
        .group_after("features", 2, &["foundation"])
        .req("f-1", req("foundation").complete())
        .req("f-2", req("foundation").status(ReqStatus::Rejected))
        .req("feat-1", req("features"))
        .build();

    assert_eq!(find_ready(&graph).unwrap(), vec!["feat-1".to_string()]);
}

#[test]
fn test_group_dependencies_are_transitive() {
    let graph = GraphBuilder::new()
        .group("a", 1)
        .group_after("b", 2, &["a"])
        .group_after("c", 3, &["b"])
        .req("a-1", req("a"))
        .req("c-1", req("c"))
        .build();

    let blocked = find_blocked(&graph);
    let c1 = blocked.iter().find(|b| b.id == "c-1").unwrap();
    // b is empty (vacuously complete); a is still open.
    assert_eq!(c1.blockers, vec![Blocker::Group("a".into())]);
}

#[test]
fn test_unknown_dependency_blocks() {
    let graph = GraphBuilder::new()
        .group("core", 1)
        .req("a", req("core").after("ghost"))
        .build();

    assert!(find_ready(&graph).unwrap().is_empty());
    let blocked = find_blocked(&graph);
    assert_eq!(blocked[0].blockers, vec![Blocker::Requirement("ghost".into())]);
}

#[test]
fn test_group_cycle_is_fatal_for_scheduling() {
    let graph = GraphBuilder::new()
        .group_after("a", 1, &["b"])
        .group_after("b", 2, &["a"])
        .req("a-1", req("a"))
        .build();

    match find_ready(&graph) {
        Err(ForgeError::Cycle { path }) => {
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&"a".to_string()));
            assert!(path.contains(&"b".to_string()));
        }
        other => panic!("Expected Cycle error, got: {:?}", other),
    }
    assert!(matches!(group_status(&graph), Err(ForgeError::Cycle { .. })));
}

#[test]
fn test_transitive_deps_in_topological_order() {
    let graph = GraphBuilder::new()
        .group("core", 1)
        .req("base", req("core"))
        .req("left", req("core").after("base"))
        .req("right", req("core").after("base"))
        .req("top", req("core").after("left").after("right").after("missing"))
        .build();

    let deps = get_transitive_deps(&graph, "top").unwrap();
    assert_eq!(deps.len(), 4);
    assert_eq!(deps.first().map(String::as_str), Some("base"));
    assert_eq!(deps.last().map(String::as_str), Some("top"));
    assert!(!deps.contains(&"missing".to_string()));
}

#[test]
fn test_transitive_deps_reports_full_cycle() {
    let graph = GraphBuilder::new()
        .group("core", 1)
        .req("a", req("core").after("b"))
        .req("b", req("core").after("c"))
        .req("c", req("core").after("a"))
        .build();

    let err = get_transitive_deps(&graph, "a").unwrap_err();
    match &err {
        ForgeError::Cycle { path } => {
            assert_eq!(path, &vec!["a", "b", "c", "a"]);
        }
        other => panic!("Expected Cycle error, got: {:?}", other),
    }
    assert_eq!(err.to_string(), "Cycle detected: a -> b -> c -> a");
}

#[test]
fn test_transitive_deps_unknown_target() {
    let graph = GraphBuilder::new().group("core", 1).build();
    assert!(matches!(
        get_transitive_deps(&graph, "nope"),
        Err(ForgeError::UnknownRequirement(id)) if id == "nope"
    ));
}

#[test]
fn test_group_status_counts_and_order() {
    let graph = GraphBuilder::new()
        .group_after("ui", 1, &["api"])
        .group("api", 5)
        .group("docs", 3)
        .req("api-1", req("api").complete())
        .req("api-2", req("api").status(ReqStatus::Rejected))
        .req("ui-1", req("ui").complete())
        .req("ui-2", req("ui").status(ReqStatus::InProgress))
        .req("stray", req("nowhere"))
        .build();

    let status = group_status(&graph).unwrap();
    let keys: Vec<&str> = status.iter().map(|g| g.key.as_str()).collect();
    // ui must follow api even though its `order` is lower.
    assert_eq!(keys, vec!["docs", "api", "ui"]);

    let api = &status[1];
    assert_eq!(api.counts.complete, 1);
    assert_eq!(api.counts.rejected, 1);
    assert!(api.is_complete);

    let ui = &status[2];
    assert_eq!(ui.counts.in_progress, 1);
    assert!(!ui.is_complete);

    let docs = &status[0];
    assert_eq!(docs.counts.total(), 0);
    assert!(docs.is_complete, "empty groups are vacuously complete");
}

#[test]
fn test_group_topological_order_breaks_ties_by_order_then_key() {
    let graph = GraphBuilder::new()
        .group("zeta", 1)
        .group("alpha", 1)
        .group("first", 0)
        .build();

    assert_eq!(
        group_topological_order(&graph).unwrap(),
        vec!["first", "alpha", "zeta"]
    );
}

#[test]
fn test_set_status_feeds_back_into_readiness() {
    let mut graph = GraphBuilder::new()
        .group("core", 1)
        .req("a", req("core"))
        .req("b", req("core").after("a"))
        .build();

    assert_eq!(find_ready(&graph).unwrap(), vec!["a".to_string()]);

    graph.set_status("a", ReqStatus::Complete).unwrap();
    assert_eq!(find_ready(&graph).unwrap(), vec!["b".to_string()]);

    assert!(matches!(
        graph.set_status("ghost", ReqStatus::Complete),
        Err(ForgeError::UnknownRequirement(_))
    ));
}

#[test]
fn test_group_order_waits_for_every_upstream_group() {
    let graph = GraphBuilder::new()
        .group_after("deploy", 0, &["api", "ui"])
        .group_after("ui", 5, &["core", "core"])
        .group_after("api", 9, &["core"])
        .group("core", 3)
        .build();

    // deploy has the lowest order but must wait for both of its parents.
    assert_eq!(
        group_topological_order(&graph).unwrap(),
        vec!["core", "ui", "api", "deploy"]
    );
}

#[test]
fn test_self_dependent_group_is_a_cycle() {
    let graph = GraphBuilder::new()
        .group("base", 1)
        .group_after("loop", 2, &["base", "loop"])
        .build();

    match group_topological_order(&graph) {
        Err(ForgeError::Cycle { path }) => assert_eq!(path, vec!["loop", "loop"]),
        other => panic!("Expected Cycle error, got: {:?}", other),
    }
}

#[test]
fn test_group_cycle_path_names_every_member() {
    let graph = GraphBuilder::new()
        .group("root", 0)
        .group_after("x", 1, &["root", "z"])
        .group_after("y", 2, &["x"])
        .group_after("z", 3, &["y"])
        .build();

    match group_topological_order(&graph) {
        Err(ForgeError::Cycle { path }) => {
            assert_eq!(path.len(), 4);
            assert_eq!(path.first(), path.last());
            for key in ["x", "y", "z"] {
                assert!(path.contains(&key.to_string()), "{key} missing from {path:?}");
            }
            assert!(!path.contains(&"root".to_string()));
        }
        other => panic!("Expected Cycle error, got: {:?}", other),
    }
}
