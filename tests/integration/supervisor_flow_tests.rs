//! Escalation path: coordinator failure → escalation queue → supervisor.

use togglepub::app::commands::PublisherCommand;
use togglepub::app::ports::ConnectionPort;
use togglepub::app::service::PublishCoordinator;
use togglepub::app::supervisor::{ConnectionSupervisor, RecoveryOutcome};
use togglepub::config::PublisherConfig;

use crate::mock_hw::{Bench, RecordingDelay};

fn config(retries: u16) -> PublisherConfig {
    let mut c = PublisherConfig::default();
    c.max_conn_retries = retries;
    c.conn_retry_interval_ms = 2000;
    c
}

#[test]
fn two_failures_reach_the_supervisor_in_order() {
    let bench = Bench::new();
    let mut coordinator =
        PublishCoordinator::new(bench.session.clone(), bench.line.control(), &config(3)).unwrap();
    let mut supervisor =
        ConnectionSupervisor::new(bench.session.clone(), RecordingDelay::default(), &config(3));
    bench.session.lock().reject_next(2);

    let escalation = bench.escalation;
    let consumer = std::thread::spawn(move || {
        let first = supervisor.step(escalation);
        let second = supervisor.step(escalation);
        (first, second, supervisor.escalations())
    });

    // The second escalation blocks on the single slot until the supervisor
    // has taken the first.
    bench.inbound.try_send_from_isr(PublisherCommand::Publish("TURN ON"));
    bench.inbound.try_send_from_isr(PublisherCommand::Publish("TURN ON"));
    coordinator.step(bench.inbound, bench.escalation).unwrap();
    coordinator.step(bench.inbound, bench.escalation).unwrap();

    let (first, second, handled) = consumer.join().unwrap();
    assert_eq!(first, RecoveryOutcome::StillConnected);
    assert_eq!(second, RecoveryOutcome::StillConnected);
    assert_eq!(handled, 2);
    assert_eq!(coordinator.failed(), 2);
}

#[test]
fn dropped_session_is_restored_and_later_presses_go_through() {
    let bench = Bench::new();
    let mut coordinator =
        PublishCoordinator::new(bench.session.clone(), bench.line.control(), &config(5)).unwrap();
    let mut supervisor =
        ConnectionSupervisor::new(bench.session.clone(), RecordingDelay::default(), &config(5));
    {
        let mut s = bench.session.lock();
        s.drop_link();
        s.refuse_reconnects(2);
    }

    bench.inbound.try_send_from_isr(PublisherCommand::Publish("TURN ON"));
    coordinator.step(bench.inbound, bench.escalation).unwrap();

    assert_eq!(supervisor.step(bench.escalation), RecoveryOutcome::Recovered { attempts: 3 });
    assert!(bench.session.clone().is_connected());

    // The failed toggle is not replayed; the next press is.
    bench.inbound.try_send_from_isr(PublisherCommand::Publish("TURN ON"));
    coordinator.step(bench.inbound, bench.escalation).unwrap();
    assert_eq!(bench.session.lock().published().len(), 1);
    assert!(bench.escalation.is_empty());
}

#[test]
fn supervisor_gives_up_after_budget() {
    let bench = Bench::new();
    let mut supervisor =
        ConnectionSupervisor::new(bench.session.clone(), RecordingDelay::default(), &config(4));
    {
        let mut s = bench.session.lock();
        s.drop_link();
        s.refuse_reconnects(u32::MAX);
    }

    bench
        .escalation
        .send_blocking(togglepub::app::events::SupervisorCommand::HandlePublishFailure);
    assert_eq!(supervisor.step(bench.escalation), RecoveryOutcome::GaveUp);
    assert_eq!(bench.session.lock().reconnects(), 4);
}
