//! Button → queue → coordinator → session, end to end on the host.

use togglepub::Error;
use togglepub::app::commands::PublisherCommand;
use togglepub::app::events::SupervisorCommand;
use togglepub::app::ports::ConnectionPort;
use togglepub::app::service::{CoordinatorState, PublishCoordinator};
use togglepub::config::PublisherConfig;
use togglepub::drivers::hw_init::{ButtonIrqControl, HwInitError, SimButtonLine};
use togglepub::adapters::session::{SharedSession, SimSession};

use crate::mock_hw::Bench;

type Coordinator = PublishCoordinator<SharedSession<SimSession>, ButtonIrqControl>;

fn armed_coordinator(bench: &Bench) -> Coordinator {
    let mut c = PublishCoordinator::new(
        bench.session.clone(),
        bench.line.control(),
        &PublisherConfig::default(),
    )
    .unwrap();
    c.handle(PublisherCommand::Init).unwrap();
    c
}

fn payloads(bench: &Bench) -> Vec<String> {
    bench
        .session
        .lock()
        .published()
        .iter()
        .map(|(_, p)| String::from_utf8(p.clone()).unwrap())
        .collect()
}

#[test]
fn press_publishes_toggle_and_echo_flips_next_payload() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    let mut isr = bench.isr(2);

    bench.press(&mut isr, 0, 50);
    c.step(bench.inbound, bench.escalation).unwrap();
    bench.press(&mut isr, 500, 50);
    c.step(bench.inbound, bench.escalation).unwrap();

    assert_eq!(payloads(&bench), ["TURN ON", "TURN OFF"]);
    assert_eq!(
        bench.session.lock().published()[0].0,
        PublisherConfig::default().publish_topic.as_str()
    );
    assert!(!bench.device.is_on());
    assert_eq!(c.published(), 2);
    assert_eq!(bench.yields.count(), 2);
}

#[test]
fn bouncing_press_publishes_once() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    let mut isr = bench.isr(2);

    bench.edge(&mut isr, 100, true);
    bench.edge(&mut isr, 100, false);
    bench.edge(&mut isr, 101, true);
    bench.edge(&mut isr, 101, false);
    bench.edge(&mut isr, 140, false);

    assert_eq!(bench.inbound.len(), 1);
    c.step(bench.inbound, bench.escalation).unwrap();
    assert_eq!(payloads(&bench), ["TURN ON"]);
}

#[test]
fn sibling_button_never_posts() {
    let bench = Bench::new();
    let _c = armed_coordinator(&bench);
    let mut isr = bench.isr(2);

    for _ in 0..5 {
        assert!(bench.line.drive_sibling());
        isr.on_interrupt();
        assert!(!bench.line.has_pending());
    }
    assert!(bench.inbound.is_empty());
}

#[test]
fn burst_beyond_capacity_keeps_first_three_in_order() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    let mut isr = bench.isr(2);

    // Four accepted presses while the publisher is busy elsewhere.
    for i in 0..4 {
        bench.press(&mut isr, i * 100, 10);
    }
    assert_eq!(bench.inbound.len(), 3);

    for _ in 0..3 {
        c.step(bench.inbound, bench.escalation).unwrap();
    }
    assert!(bench.inbound.is_empty());
    // The device was off for every press, so all three ask to turn it on.
    assert_eq!(payloads(&bench), ["TURN ON", "TURN ON", "TURN ON"]);
}

#[test]
fn failed_publish_escalates_once_then_next_command_runs() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    let mut isr = bench.isr(2);
    bench.session.lock().reject_next(1);

    bench.press(&mut isr, 0, 10);
    bench.press(&mut isr, 100, 10);

    c.step(bench.inbound, bench.escalation).unwrap();
    assert_eq!(c.state(), CoordinatorState::Idle);
    assert_eq!(bench.escalation.len(), 1);
    assert_eq!(bench.escalation.try_recv(), Some(SupervisorCommand::HandlePublishFailure));

    c.step(bench.inbound, bench.escalation).unwrap();
    assert!(bench.escalation.is_empty());
    assert_eq!(c.failed(), 1);
    assert_eq!(c.published(), 1);
}

#[test]
fn dropped_link_reports_not_connected_without_retry() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    bench.session.lock().drop_link();

    let esc = c.handle(PublisherCommand::Publish("TURN ON")).unwrap();
    assert_eq!(esc, Some(SupervisorCommand::HandlePublishFailure));
    assert!(bench.session.lock().published().is_empty());
    assert!(!bench.session.clone().is_connected());
}

#[test]
fn deinit_silences_the_button() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    let mut isr = bench.isr(2);

    bench.inbound.try_send_from_isr(PublisherCommand::Deinit);
    c.step(bench.inbound, bench.escalation).unwrap();
    assert!(!bench.line.is_armed());

    bench.press(&mut isr, 0, 10);
    assert!(bench.inbound.is_empty());

    bench.inbound.try_send_from_isr(PublisherCommand::Init);
    c.step(bench.inbound, bench.escalation).unwrap();
    bench.press(&mut isr, 100, 10);
    assert_eq!(bench.inbound.len(), 1);
}

#[test]
fn run_returns_fatal_error_when_line_cannot_be_armed() {
    let bench = Bench::new();
    let line = SimButtonLine::new();
    line.fail_next_enable();
    let c = PublishCoordinator::new(bench.session.clone(), line.control(), &PublisherConfig::default())
        .unwrap();

    let fatal = c.run(bench.inbound, bench.escalation);
    assert_eq!(fatal, Error::Init(HwInitError::IntrEnableFailed(-1)));
}

#[test]
fn publisher_task_parks_until_a_press_arrives() {
    let bench = Bench::new();
    let mut c = armed_coordinator(&bench);
    let inbound = bench.inbound;
    let escalation = bench.escalation;

    let worker = std::thread::spawn(move || {
        c.step(inbound, escalation).unwrap();
        c.published()
    });

    std::thread::sleep(std::time::Duration::from_millis(20));
    let mut isr = bench.isr(2);
    bench.press(&mut isr, 0, 10);

    assert_eq!(worker.join().unwrap(), 1);
}
