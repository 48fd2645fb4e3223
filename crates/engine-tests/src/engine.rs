#[cfg(test)]
mod tests {
    use crate::{
        Harness,
        utils::{plan, transform},
    };
    use engine_config::{
        environment::DeploymentEnvironment,
        flags::{Feature, FeatureFlags},
        rollout::{decide, derive_execution_id, rollout_bucket, should_use_next},
    };
    use engine_runtime::{
        error::{BridgeError, RuntimeError},
        execution::factory::{RuntimeParts, create_runner},
    };
    use model::execution::{
        plan::{ExecutionPlan, Variables},
        result::{EngineKind, ExecutionStatus},
    };
    use planner::graph::DependencyResolver;
    use tokio_util::sync::CancellationToken;

    fn rollout(pct: i64) -> FeatureFlags {
        FeatureFlags::default()
            .with_feature(Feature::NextEngine, true)
            .with_feature(Feature::GradualRollout, true)
            .with_rollout_percentage(pct)
            .unwrap()
    }

    fn chain() -> ExecutionPlan {
        plan(vec![
            transform("a", "CREATE TABLE a AS SELECT 1"),
            transform("b", "CREATE TABLE b AS SELECT * FROM a").after(["a"]),
            transform("c", "CREATE TABLE c AS SELECT * FROM b").after(["b"]),
        ])
    }

    // Scenario: the same execution id is decided many times under one flag snapshot.
    // Expected Outcome: the decision never changes.
    #[test]
    fn tc01_rollout_is_deterministic() {
        let flags = rollout(50);
        for n in 0..100 {
            let id = derive_execution_id(&[format!("step_{n}")], 481_000);
            let first = decide(&id, &flags);
            for _ in 0..10 {
                assert_eq!(decide(&id, &flags), first);
            }
        }
    }

    // Scenario: gradual rollout at 0% and 100%.
    // Expected Outcome: never next, always next.
    #[test]
    fn tc02_rollout_boundaries() {
        let none = rollout(0);
        let all = rollout(100);
        for n in 0..500 {
            let id = derive_execution_id(&[format!("s{n}"), "load".to_string()], 7);
            assert!(!should_use_next(&id, &none));
            assert!(should_use_next(&id, &all));
        }
    }

    // Scenario: 1000 distinct execution ids at a 30% rollout.
    // Expected Outcome: the share routed to next is within 10 points of 30%.
    #[test]
    fn tc03_rollout_rate_tracks_percentage() {
        let flags = rollout(30);
        let routed = (0..1000)
            .map(|n| derive_execution_id(&[format!("pipeline_{n}")], 12))
            .filter(|id| should_use_next(id, &flags))
            .count();
        assert!((200..=400).contains(&routed), "routed {routed} of 1000");

        let below = (0..1000)
            .map(|n| derive_execution_id(&[format!("pipeline_{n}")], 12))
            .filter(|id| rollout_bucket(id) < 30)
            .count();
        assert_eq!(routed, below);
    }

    // Scenario: forced-engine flags with rollout settings that disagree.
    // Expected Outcome: the forced engine wins.
    #[test]
    fn tc04_forced_flags_override_rollout() {
        let id = derive_execution_id(&["a"], 1);
        let forced_legacy = rollout(100).with_feature(Feature::ForceLegacy, true);
        let forced_next = FeatureFlags::default().with_feature(Feature::ForceNext, true);

        assert_eq!(decide(&id, &forced_legacy).engine, EngineKind::Legacy);
        assert_eq!(decide(&id, &forced_next).engine, EngineKind::Next);
    }

    // Scenario: building a runtime with both forced-engine flags on.
    // Expected Outcome: a conflicting-flags configuration error.
    #[test]
    fn tc05_conflicting_force_flags_fail_construction() {
        let dir = tempfile::tempdir().unwrap();
        let settings = engine_config::settings::EngineSettings::with_state_dir(dir.path());
        let flags = FeatureFlags::for_environment(DeploymentEnvironment::Development)
            .with_feature(Feature::ForceLegacy, true)
            .with_feature(Feature::ForceNext, true);
        let parts = RuntimeParts::new(
            std::sync::Arc::new(engine_core::warehouse::memory::MemoryWarehouse::new()),
            std::sync::Arc::new(engine_core::connectors::registry::ConnectorRegistry::new()),
            std::sync::Arc::new(engine_core::state::memory::InMemoryWatermarkStore::new()),
        );

        assert!(matches!(
            create_runner(&settings, flags, &parts),
            Err(RuntimeError::Config(_))
        ));
    }

    // Scenario: A -> B -> C resolved and executed.
    // Expected Outcome: order [A, B, C]; statements run in that order with no safeguard warning.
    #[tokio::test]
    async fn tc06_dependency_order_is_respected() {
        let p = chain();
        let resolver = DependencyResolver::from_steps(&p.steps);
        assert_eq!(resolver.execution_order(&p.step_ids()).unwrap(), ["a", "b", "c"]);
        assert_eq!(resolver.resolve_dependencies("c").unwrap(), ["a", "b", "c"]);

        let h = Harness::new(FeatureFlags::default());
        let out = h.run(&p).await;

        assert_eq!(out.report.status(), ExecutionStatus::Success);
        assert_eq!(h.runner.bridge().safeguard().warnings_emitted(), 0);
        let statements = h.warehouse.inner.statements().await;
        assert!(statements[0].contains("TABLE a"));
        assert!(statements[2].contains("TABLE c"));
    }

    // Scenario: steps submitted as [C, A, B] although C depends on B and B on A.
    // Expected Outcome: the run completes in submission order with exactly one safeguard warning.
    #[tokio::test]
    async fn tc07_out_of_order_submission_warns_once() {
        let mut p = chain();
        p.steps.rotate_right(1);
        assert_eq!(p.step_ids(), ["c", "a", "b"]);

        let h = Harness::new(FeatureFlags::default());
        let out = h.run(&p).await;

        assert_eq!(out.report.status(), ExecutionStatus::Success);
        assert_eq!(out.report.result().executed_steps(), 3);
        assert_eq!(h.runner.bridge().safeguard().warnings_emitted(), 1);
        assert!(h.warehouse.inner.statements().await[0].contains("TABLE c"));
    }

    // Scenario: the safeguard flag is off and steps are out of order.
    // Expected Outcome: no check is made.
    #[tokio::test]
    async fn tc08_safeguard_can_be_disabled() {
        let mut p = chain();
        p.steps.reverse();

        let h = Harness::new(FeatureFlags::default().with_feature(Feature::OrderSafeguard, false));
        h.run(&p).await;

        assert_eq!(h.runner.bridge().safeguard().warnings_emitted(), 0);
    }

    // Scenario: next engine is selected and loses its warehouse connection on step 2; fallback on.
    // Expected Outcome: the legacy result is returned, fallback_count is 1 and the run succeeds.
    #[tokio::test]
    async fn tc09_next_fault_falls_back_to_legacy() {
        let h = Harness::new(FeatureFlags::default().with_feature(Feature::NextEngine, true));
        h.warehouse.fail_statements("TABLE b", 1);

        let out = h.run(&chain()).await;

        assert_eq!(out.report.status(), ExecutionStatus::Success);
        assert_eq!(out.report.engine(), EngineKind::Legacy);
        assert!(out.report.fallback_used());

        let metrics = h.runner.bridge().execution_metrics();
        assert_eq!(metrics.fallback_count, 1);
        assert_eq!(metrics.next_attempts, 1);
        assert_eq!(metrics.next_failures, 1);
        assert_eq!(metrics.per_engine_counts[&EngineKind::Legacy], 1);
        assert_eq!(metrics.per_engine_counts[&EngineKind::Next], 0);

        // Step "a" ran once on each engine.
        let statements = h.warehouse.inner.statements().await;
        assert_eq!(statements.iter().filter(|s| s.contains("TABLE a")).count(), 2);
    }

    // Scenario: same fault with fallback disabled.
    // Expected Outcome: the next engine's error propagates and legacy never runs.
    #[tokio::test]
    async fn tc10_fault_propagates_without_fallback() {
        let flags = FeatureFlags::default()
            .with_feature(Feature::NextEngine, true)
            .with_feature(Feature::Fallback, false);
        let h = Harness::new(flags);
        h.warehouse.fail_statements("TABLE b", 1);

        let err = h
            .runner
            .run(&chain(), &Variables::new(), CancellationToken::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, RuntimeError::Bridge(BridgeError::Engine(_))));
        assert!(err.to_string().contains("connection lost"));
        assert_eq!(h.runner.bridge().execution_metrics().fallback_count, 0);
        assert_eq!(h.warehouse.inner.statements().await.len(), 1);
    }

    // Scenario: next faults and the legacy fallback faults as well.
    // Expected Outcome: a combined error carrying both messages.
    #[tokio::test]
    async fn tc11_both_engines_failing_is_reported() {
        let h = Harness::new(FeatureFlags::default().with_feature(Feature::NextEngine, true));
        h.warehouse.fail_statements("TABLE b", 2);

        let err = h
            .runner
            .run(&chain(), &Variables::new(), CancellationToken::new())
            .await
            .err()
            .unwrap();

        match err {
            RuntimeError::Bridge(BridgeError::BothEnginesFailed { next, legacy }) => {
                assert!(next.contains("connection lost"));
                assert!(legacy.contains("connection lost"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // Scenario: an interrupted next-engine execution is resumed.
    // Expected Outcome: only the unfinished steps run.
    #[tokio::test]
    async fn tc12_resume_continues_from_first_unfinished_step() {
        let flags = FeatureFlags::default()
            .with_feature(Feature::NextEngine, true)
            .with_feature(Feature::Fallback, false);
        let h = Harness::new(flags);
        h.warehouse.fail_statements("TABLE b", 1);
        let p = chain();

        let bridge = h.runner.bridge();
        let (execution_id, decision) = bridge.route(&p);
        assert_eq!(decision.engine, EngineKind::Next);
        assert!(bridge.execute(&p, &Variables::new()).await.is_err());
        let state = bridge.execution_state(&execution_id).unwrap();
        assert_eq!(state.completed_step_ids().collect::<Vec<_>>(), ["a"]);

        let result = bridge
            .resume(&execution_id, &p, &Variables::new())
            .await
            .unwrap();

        assert_eq!(result.status(), ExecutionStatus::Success);
        assert_eq!(result.executed_steps(), 3);
        let statements = h.warehouse.inner.statements().await;
        assert_eq!(statements.iter().filter(|s| s.contains("TABLE a")).count(), 1);
    }

    // Scenario: the run is cancelled before it starts.
    // Expected Outcome: a failed result with no steps executed.
    #[tokio::test]
    async fn tc13_cancelled_run_executes_nothing() {
        let h = Harness::new(FeatureFlags::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = h
            .runner
            .run(&chain(), &Variables::new(), cancel)
            .await
            .unwrap();

        assert_eq!(out.report.status(), ExecutionStatus::Failed);
        assert_eq!(out.report.result().executed_steps(), 0);
        assert!(h.warehouse.inner.statements().await.is_empty());
    }
}
