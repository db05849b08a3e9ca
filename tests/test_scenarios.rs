mod common;

use common::{config, controller, independent_tasks, resource, store, workflow};
use tracing_test::traced_test;

use wf_sim_scheduler::domain::scheduling::compute_service_scheme::ComputeServiceScheme;
use wf_sim_scheduler::domain::scheduling::controller::ControllerState;
use wf_sim_scheduler::domain::scheduling::job::{FileCopy, FileLocation};
use wf_sim_scheduler::domain::scheduling::scheduler_config::FailurePolicy;
use wf_sim_scheduler::domain::scheduling::storage_service_scheme::StorageServiceScheme;
use wf_sim_scheduler::domain::scheduling::task_selector::SortDirection;
use wf_sim_scheduler::domain::simulator::simulator_mock::MockEnvironment;
use wf_sim_scheduler::domain::utils::id::{FileId, ResourceName, TaskId};
use wf_sim_scheduler::error::SchedulingError;

use ComputeServiceScheme::{AllBareMetal, AllBareMetalExact, HtCondorBareMetal};
use StorageServiceScheme::{ComputeHostStorage, SubmitAndComputeHosts, SubmitOnly};

#[test]
fn single_task_on_four_cores_uses_the_submit_storage() {
    let store = store(&[("host_1", 4)], AllBareMetal);
    let host = resource(&store, "host_1");
    let submit = store.get_submit_storage();
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(workflow(&[("task_1", &[("in_1", 100), ("in_2", 200)], &[("out_1", 50)])])).without_auto_notify();

    assert_eq!(controller.get_resource_pool().get_remaining(host), Some(4));
    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 1);

    assert_eq!(env.submissions.len(), 1);
    let submission = &env.submissions[0];
    assert_eq!(submission.target, host);
    assert_eq!(controller.get_resource_pool().get_remaining(host), Some(3));

    let placement = submission.job.get_placement();
    assert_eq!(placement.file_locations.len(), 3);
    for (file, location) in &placement.file_locations {
        assert_eq!(location, &FileLocation::location(submit, file.clone()));
    }
    assert!(placement.pre_file_copies.is_empty());
    assert!(placement.post_file_copies.is_empty());
    assert_eq!(submission.job.get_service_arguments().get("task_1").map(String::as_str), Some("1"));
}

#[test]
fn exhausted_resource_ends_the_dispatch_pass() {
    let store = store(&[("host_1", 1)], AllBareMetal);
    let host = resource(&store, "host_1");
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["task_a", "task_b"])).without_auto_notify();

    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 1);

    assert_eq!(env.submitted_task_ids(), vec!["task_b"]);
    assert_eq!(controller.get_resource_pool().get_remaining(host), Some(0));
    // The overhead is also charged for the attempt that found no resource
    assert_eq!(env.sleeps, vec![0.5, 0.5]);
}

#[test]
fn deferred_task_is_dispatched_after_a_completion() {
    let store = store(&[("host_1", 1)], AllBareMetal);
    let host = resource(&store, "host_1");
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["task_a", "task_b"]));

    let statistics = controller.run(&mut env).unwrap();

    assert_eq!(env.submitted_task_ids(), vec!["task_b", "task_a"]);
    let passes: Vec<usize> = env.submissions.iter().map(|s| s.pass).collect();
    assert_eq!(passes, vec![0, 1]);
    assert_eq!(statistics.jobs_submitted, 2);
    assert_eq!(statistics.jobs_completed, 2);
    assert_eq!(statistics.dispatch_passes, 2);
    assert_eq!(controller.get_state(), ControllerState::Done);
    assert_eq!(controller.get_resource_pool().get_remaining(host), Some(1));
}

#[test]
fn scratch_round_trip_stages_two_inputs_and_one_output() {
    let store = store(&[("host_1", 2)], AllBareMetal);
    let submit = store.get_submit_storage();
    let mut controller = controller(config(AllBareMetal, SubmitAndComputeHosts), &store);
    let mut env = MockEnvironment::new(workflow(&[("task_1", &[("in_1", 100), ("in_2", 200)], &[("out_1", 50)])])).without_auto_notify();

    controller.dispatch_pass(&mut env).unwrap();

    let placement = env.submissions[0].job.get_placement();
    assert_eq!(placement.file_locations.len(), 3);
    assert!(placement.file_locations.values().all(FileLocation::is_scratch));

    assert_eq!(placement.pre_file_copies.len(), 2);
    for copy in &placement.pre_file_copies {
        assert_eq!(copy.source, FileLocation::location(submit, copy.source.file.clone()));
        assert!(copy.destination.is_scratch());
    }
    assert_eq!(
        placement.post_file_copies,
        vec![FileCopy { source: FileLocation::scratch(FileId::new("out_1")), destination: FileLocation::location(submit, FileId::new("out_1")) }]
    );
    assert!(placement.cleanup_file_deletions.is_empty());
}

#[test]
fn failure_under_abort_stops_event_processing() {
    let store = store(&[("host_1", 2)], AllBareMetal);
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["task_a", "task_b"]));
    env.fail_task("task_b");

    let err = controller.run(&mut env).unwrap_err();

    assert!(matches!(err, SchedulingError::TaskFailed { ref task, .. } if *task == TaskId::new("task_b")));
    assert_eq!(env.events_delivered, 1);
    assert_eq!(env.remaining_events(), 1);
    assert_eq!(controller.get_state(), ControllerState::AwaitingEvent);
    assert_eq!(controller.get_statistics().jobs_failed, 1);
}

#[traced_test]
#[test]
fn failure_under_continue_is_logged_and_leaves_cores_untouched() {
    let store = store(&[("host_1", 2)], AllBareMetalExact);
    let host = resource(&store, "host_1");
    let mut controller = controller(config(AllBareMetalExact, SubmitOnly).with_failure_policy(FailurePolicy::Continue), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["task_a", "task_b"]));
    env.fail_task("task_b");

    let statistics = controller.run(&mut env).unwrap();

    assert_eq!(statistics.jobs_completed, 1);
    assert_eq!(statistics.jobs_failed, 1);
    assert_eq!(controller.get_num_in_flight(), 0);
    // Only the completed job gave its core back
    assert_eq!(controller.get_resource_pool().get_remaining(host), Some(1));
    assert!(logs_contain("Job failed"));
    assert!(logs_contain("task_b"));
    assert!(logs_contain("host_1"));

    // Stopped for good, but the workflow did not fully execute
    assert!(!env.workflow.is_done());
    assert_eq!(controller.get_state(), ControllerState::Halted);
    assert_eq!(controller.get_resource_pool().get_name(host), Some(&ResourceName::new("host_1")));
}

#[test]
fn leaky_allocation_reserves_every_scanned_resource() {
    let store = store(&[("host_1", 2), ("host_2", 2), ("host_3", 2)], AllBareMetal);
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["t1", "t2", "t3", "t4"])).without_auto_notify();

    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 2);

    assert_eq!(env.submitted_task_ids(), vec!["t4", "t3"]);
    assert!(env.submissions.iter().all(|s| s.target == resource(&store, "host_3")));
    for host in ["host_1", "host_2", "host_3"] {
        assert_eq!(controller.get_resource_pool().get_remaining(resource(&store, host)), Some(0));
    }
}

#[test]
fn leaked_cores_are_never_returned() {
    let store = store(&[("host_1", 2), ("host_2", 2), ("host_3", 2)], AllBareMetal);
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["t1", "t2", "t3", "t4"]));

    controller.run(&mut env).unwrap();

    let pool = controller.get_resource_pool();
    assert_eq!(pool.get_remaining(resource(&store, "host_1")), Some(0));
    assert_eq!(pool.get_remaining(resource(&store, "host_2")), Some(0));
    assert_eq!(pool.get_remaining(resource(&store, "host_3")), Some(2));
    assert!(env.submissions.iter().all(|s| s.target == resource(&store, "host_3")));
}

#[test]
fn exact_allocation_fills_every_resource() {
    let store = store(&[("host_1", 2), ("host_2", 2), ("host_3", 2)], AllBareMetalExact);
    let mut controller = controller(config(AllBareMetalExact, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["t1", "t2", "t3", "t4"])).without_auto_notify();

    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 4);

    let targets: Vec<ResourceName> = env.submissions.iter().map(|s| store.get_compute_resource_name(s.target).unwrap().clone()).collect();
    assert_eq!(targets, vec![ResourceName::new("host_3"), ResourceName::new("host_3"), ResourceName::new("host_2"), ResourceName::new("host_2")]);
    assert_eq!(controller.get_resource_pool().get_remaining(resource(&store, "host_1")), Some(2));
}

#[test]
fn empty_ready_set_goes_straight_to_waiting() {
    let store = store(&[("host_1", 4)], AllBareMetal);
    let host = resource(&store, "host_1");
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(workflow(&[("first", &[], &[("mid", 1)]), ("second", &[("mid", 1)], &[])])).without_auto_notify();

    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 1);
    let sleeps = env.sleeps.len();

    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 0);
    assert_eq!(env.submissions.len(), 1);
    assert_eq!(env.sleeps.len(), sleeps);
    assert_eq!(controller.get_resource_pool().get_remaining(host), Some(3));
    assert_eq!(controller.get_statistics().dispatch_passes, 1);
}

#[test]
fn finished_workflow_is_done_without_waiting() {
    let store = store(&[("host_1", 1)], AllBareMetal);
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&[]));

    let statistics = controller.run(&mut env).unwrap();

    assert_eq!(statistics.jobs_submitted, 0);
    assert_eq!(env.wait_calls, 0);
    assert_eq!(controller.get_state(), ControllerState::Done);
}

#[test]
fn ascending_ordering_reverses_dispatch() {
    let store = store(&[("host_1", 1)], AllBareMetal);
    let mut controller = controller(config(AllBareMetal, SubmitOnly).with_task_ordering(SortDirection::Ascending), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["task_a", "task_b", "task_c"]));

    controller.run(&mut env).unwrap();

    assert_eq!(env.submitted_task_ids(), vec!["task_a", "task_b", "task_c"]);
}

#[test]
fn passthrough_sends_everything_to_the_pool() {
    let store = store(&[("host_1", 1), ("host_2", 1)], HtCondorBareMetal);
    let pool = resource(&store, "htcondor_pool");
    let mut controller = controller(config(HtCondorBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["t1", "t2", "t3"])).without_auto_notify();

    assert_eq!(controller.dispatch_pass(&mut env).unwrap(), 3);
    assert!(env.submissions.iter().all(|s| s.target == pool && s.job.get_service_arguments().is_empty()));
    assert_eq!(controller.get_resource_pool().get_remaining(pool), Some(2));
}

#[test]
fn remote_streaming_without_partner_is_reported_at_first_use() {
    let store = store(&[("host_1", 1)], HtCondorBareMetal);
    let mut controller = controller(config(HtCondorBareMetal, ComputeHostStorage), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["t1"]));

    let err = controller.run(&mut env).unwrap_err();

    assert_eq!(err, SchedulingError::MissingStoragePartner(ResourceName::new("htcondor_pool")));
    assert!(env.submissions.is_empty());
}

#[test]
fn no_cores_and_no_events_is_a_stall() {
    let store = store(&[("host_1", 0)], AllBareMetal);
    let mut controller = controller(config(AllBareMetal, SubmitOnly), &store);
    let mut env = MockEnvironment::new(independent_tasks(&["t1"]));

    assert_eq!(controller.run(&mut env).unwrap_err(), SchedulingError::Stalled { unfinished: 1 });
}
