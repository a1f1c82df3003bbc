//! Scenario matrix over the action's terragrunt modes: plan, plan-then-apply
//! with a saved artifact, run-all across a dependency tree, auto-approved
//! destroy, ssh probing, and the fixture-isolation property. Steps inside one
//! scenario are intrinsically ordered and run sequentially in one test;
//! independent scenarios run on parallel test threads with exclusively owned
//! fixtures.

mod support;

use support::{action_script, version_matrix, ActionConfig};
use tg_action_harness::{run_script, Fixture, RunConfig, RunResult};

fn run_in(tc: &ActionConfig, fixture: &Fixture, command: &str) -> RunResult {
    let cfg = RunConfig::builder("terragrunt-action:script")
        .fixture(fixture)
        .tool_version(tc.tool, tc.tool_version)
        .tg_version(tc.tg_version)
        .command(command)
        .build();
    run_script(&cfg, &action_script()).expect("action script should start")
}

#[test]
fn plan_then_apply_saved_plan_artifact() {
    let tc = version_matrix()[0];
    let fixture = Fixture::provision("action-execution").expect("provision");

    let plan = run_in(&tc, &fixture, "plan -out=tf.plan");
    assert!(plan.success(), "plan step failed:\n{}", plan.output);
    plan.assert_contains("1 to add, 0 to change, 0 to destroy");
    assert!(
        fixture.path().join("tf.plan").is_file(),
        "saved plan artifact missing from fixture"
    );

    let apply = run_in(&tc, &fixture, "apply tf.plan");
    assert!(apply.success(), "apply step failed:\n{}", apply.output);
    apply.assert_contains("Apply complete! Resources: 1 added, 0 changed, 0 destroyed");
    fixture.cleanup();
}

#[test]
fn apply_of_missing_saved_plan_fails() {
    // If the plan step never ran, applying its artifact must fail loudly,
    // never silently succeed.
    let tc = version_matrix()[0];
    let fixture = Fixture::provision("action-execution").expect("provision");

    let apply = run_in(&tc, &fixture, "apply tf.plan");
    assert!(!apply.success(), "apply without plan must fail:\n{}", apply.output);
    apply.assert_contains("Saved plan file tf.plan not found");
}

#[test]
fn destroy_auto_approve_after_apply() {
    let tc = version_matrix()[0];
    let fixture = Fixture::provision("action-execution").expect("provision");

    let apply = run_in(&tc, &fixture, "apply -auto-approve");
    assert!(apply.success(), "apply failed:\n{}", apply.output);
    apply.assert_contains("Apply complete! Resources: 1 added, 0 changed, 0 destroyed");

    let destroy = run_in(&tc, &fixture, "destroy -auto-approve");
    assert!(destroy.success(), "destroy failed:\n{}", destroy.output);
    destroy.assert_contains("Destroy complete! Resources: 1 destroyed");
    fixture.cleanup();
}

#[test]
fn run_all_apply_then_destroy_across_dependency_tree() {
    let tc = version_matrix()[0];
    let fixture = Fixture::provision("dependencies-project").expect("provision");

    let apply = run_in(&tc, &fixture, "run-all apply");
    assert!(apply.success(), "run-all apply failed:\n{}", apply.output);
    apply.assert_contains("project-a");
    apply.assert_contains("project-b");
    apply.assert_contains("Apply complete! Resources: 1 added, 0 changed, 0 destroyed");

    let destroy = run_in(&tc, &fixture, "run-all destroy");
    assert!(destroy.success(), "run-all destroy failed:\n{}", destroy.output);
    destroy.assert_contains("0 to add, 0 to change, 1 to destroy");
    destroy.assert_contains("Resources: 1 destroyed");
    fixture.cleanup();
}

#[test]
fn working_dir_override_targets_subdirectory() {
    let tc = version_matrix()[0];
    let fixture = Fixture::provision("dependencies-project").expect("provision");

    let cfg = RunConfig::builder("terragrunt-action:script")
        .fixture(&fixture)
        .tool_version(tc.tool, tc.tool_version)
        .tg_version(tc.tg_version)
        .working_dir("project-a")
        .command("apply -auto-approve")
        .build();
    let result = run_script(&cfg, &action_script()).expect("action script should start");

    assert!(result.success(), "scoped apply failed:\n{}", result.output);
    result.assert_contains("Apply complete! Resources: 1 added, 0 changed, 0 destroyed");
    assert!(
        fixture.path().join("project-a/.tg-state").is_file(),
        "state expected under project-a only"
    );
    assert!(
        !fixture.path().join("project-b/.tg-state").exists(),
        "sibling unit must stay untouched"
    );
}

#[test]
fn concurrent_fixtures_stay_isolated() {
    // Scenario A's state must never satisfy scenario B's assertions: a plan
    // in a fresh fixture still sees one resource to add even after another
    // fixture from the same template was applied.
    let tc = version_matrix()[0];
    let a = Fixture::provision("action-execution").expect("provision a");
    let b = Fixture::provision("action-execution").expect("provision b");

    let apply_a = run_in(&tc, &a, "apply -auto-approve");
    assert!(apply_a.success(), "apply in A failed:\n{}", apply_a.output);

    let plan_b = run_in(&tc, &b, "plan");
    assert!(plan_b.success(), "plan in B failed:\n{}", plan_b.output);
    plan_b.assert_contains("1 to add, 0 to change, 0 to destroy");
}

#[cfg(unix)]
#[test]
fn ssh_mode_probes_agent_socket() {
    use std::os::unix::net::UnixListener;

    let tc = version_matrix()[0];
    let fixture = Fixture::provision("ssh-project").expect("provision");

    // A live agent socket on the host stands in for the sidecar here; the
    // full containerized wiring is covered by the docker e2e suite.
    let sock_dir = tempfile::tempdir().expect("sock dir");
    let sock_path = sock_dir.path().join("agent-test.sock");
    let _listener = UnixListener::bind(&sock_path).expect("bind agent socket");

    let cfg = RunConfig::builder("terragrunt-action:script")
        .fixture(&fixture)
        .tool_version(tc.tool, tc.tool_version)
        .tg_version(tc.tg_version)
        .command("plan")
        .env("SSH_AUTH_SOCK", &sock_path.display().to_string())
        .build();
    let result = run_script(&cfg, &action_script()).expect("action script should start");

    assert!(result.success(), "ssh plan failed:\n{}", result.output);
    result.assert_contains("ssh-agent socket detected");
    result.assert_contains("has been successfully initialized!");
}

#[cfg(unix)]
#[test]
fn ssh_mode_fails_without_agent_socket() {
    let tc = version_matrix()[0];
    let fixture = Fixture::provision("ssh-project").expect("provision");

    let cfg = RunConfig::builder("terragrunt-action:script")
        .fixture(&fixture)
        .tool_version(tc.tool, tc.tool_version)
        .tg_version(tc.tg_version)
        .command("plan")
        .env("SSH_AUTH_SOCK", "/nonexistent/agent.sock")
        .build();
    let result = run_script(&cfg, &action_script()).expect("action script should start");

    assert!(!result.success(), "missing socket must fail:\n{}", result.output);
    result.assert_contains("no agent socket found");
}
