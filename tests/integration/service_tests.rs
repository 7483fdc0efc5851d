//! End-to-end command dispatch: console text → parser → service → mock lines.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use super::mock_hw::{LogSink, MockController};

use gpiotool::app::commands::GpioCommand;
use gpiotool::app::events::AppEvent;
use gpiotool::app::service::{CommandOutcome, GpioService};
use gpiotool::app::session::Session;
use gpiotool::config::ToolConfig;
use gpiotool::error::GpioError;
use gpiotool::line::WritePolicy;
use gpiotool::pins::RPI_40PIN;
use gpiotool::registry::LineRegistry;
use gpiotool::types::{DriveMode, Level, LogicalLine, PhysicalSlot};

fn make_service(config: &ToolConfig) -> (GpioService<MockController>, Arc<LineRegistry<MockController>>) {
    let reg = Arc::new(LineRegistry::initialize(Some(MockController::new(28)), &RPI_40PIN).unwrap());
    (GpioService::new(Arc::clone(&reg), config).unwrap(), reg)
}

fn run(
    svc: &GpioService<MockController>,
    session: &mut Session,
    sink: &mut LogSink,
    input: &str,
) -> Result<CommandOutcome, GpioError> {
    let cmd = GpioCommand::parse(input).unwrap();
    svc.execute(session, cmd, sink)
}

#[test]
fn scripted_session_drives_the_selected_line() {
    let (svc, reg) = make_service(&ToolConfig::default());
    let probe = reg.controller().probe(LogicalLine(17));
    let mut session = Session::new();
    let mut sink = LogSink::new();

    run(&svc, &mut session, &mut sink, "select gpio17").unwrap();
    run(&svc, &mut session, &mut sink, "mode output").unwrap();
    run(&svc, &mut session, &mut sink, "write high").unwrap();
    let read = run(&svc, &mut session, &mut sink, "read").unwrap();
    assert_eq!(
        read,
        CommandOutcome::Level {
            line: LogicalLine(17),
            level: Level::High
        }
    );
    assert_eq!(probe.writes().last().map(|w| w.level), Some(Level::High));

    let rendered = sink.rendered();
    assert_eq!(rendered.len(), 4);
    assert!(rendered[0].starts_with("LineSelected"));
    assert!(rendered[3].starts_with("LevelRead"));
}

#[test]
fn pulse_and_stop_through_commands() {
    let (svc, reg) = make_service(&ToolConfig::default());
    let probe = reg.controller().probe(LogicalLine(18));
    let mut session = Session::new();
    let mut sink = LogSink::new();

    run(&svc, &mut session, &mut sink, "select 18").unwrap();
    run(&svc, &mut session, &mut sink, "pulse 10 10").unwrap();
    assert_eq!(
        run(&svc, &mut session, &mut sink, "pulse 10 10"),
        Err(GpioError::AlreadyRunning(LogicalLine(18)))
    );
    assert_eq!(
        run(&svc, &mut session, &mut sink, "write low"),
        Err(GpioError::LineBusy(LogicalLine(18)))
    );
    assert_eq!(
        run(&svc, &mut session, &mut sink, "select 23"),
        Err(GpioError::PulseActive(LogicalLine(18)))
    );
    std::thread::sleep(Duration::from_millis(60));
    let stopped = run(&svc, &mut session, &mut sink, "stop").unwrap();
    let CommandOutcome::PulseStopped(report) = stopped else {
        panic!("unexpected outcome {:?}", stopped);
    };
    assert!(report.cycles >= 1);
    assert!(probe.write_count() >= 2);

    run(&svc, &mut session, &mut sink, "write low").unwrap();
    assert!(sink.events.contains(&AppEvent::CommandFailed(GpioError::LineBusy(LogicalLine(18)))));
}

#[test]
fn guarded_writes_need_output_mode() {
    let config = ToolConfig {
        write_policy: WritePolicy::RequireOutput,
        ..ToolConfig::default()
    };
    let (svc, _reg) = make_service(&config);
    let mut session = Session::new();
    let mut sink = LogSink::new();

    assert_eq!(
        run(&svc, &mut session, &mut sink, "write 22 1"),
        Err(GpioError::NotAnOutput(LogicalLine(22)))
    );
    assert_eq!(
        run(&svc, &mut session, &mut sink, "pulse 22"),
        Err(GpioError::NotAnOutput(LogicalLine(22)))
    );
    run(&svc, &mut session, &mut sink, "mode 22 out").unwrap();
    run(&svc, &mut session, &mut sink, "write 22 1").unwrap();
    assert_eq!(svc.read_level(LogicalLine(22)), Ok(Level::High));
    assert_eq!(svc.drive_mode(LogicalLine(22)), Ok(DriveMode::Output));
}

#[test]
fn list_reports_each_mapped_slot_once() {
    let (svc, _reg) = make_service(&ToolConfig::default());
    let mut session = Session::new();
    let mut sink = LogSink::new();
    let CommandOutcome::Pins(pins) = run(&svc, &mut session, &mut sink, "list").unwrap() else {
        panic!("list did not return pins");
    };
    let slots: Vec<PhysicalSlot> = pins.iter().map(|p| p.slot).collect();
    let expected: Vec<PhysicalSlot> = RPI_40PIN.lines().map(|(slot, _)| slot).collect();
    assert_eq!(slots, expected);
    assert!(sink.events.is_empty());
}

#[test]
fn watch_delivers_edges_by_slot() {
    let (svc, reg) = make_service(&ToolConfig::default());
    let probe = reg.controller().probe(LogicalLine(26));
    let (tx, rx) = mpsc::channel();
    let notifier = svc
        .watch(move |slot: PhysicalSlot, level: Level| {
            let _ = tx.send((slot, level));
        })
        .unwrap();
    assert!(probe.is_subscribed());

    probe.edge(Level::High);
    probe.edge(Level::Low);
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok((PhysicalSlot(37), Level::High)));
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok((PhysicalSlot(37), Level::Low)));

    drop(notifier);
    assert!(!probe.is_subscribed());
}

#[test]
fn only_one_watcher_at_a_time() {
    let (svc, reg) = make_service(&ToolConfig::default());
    let probe = reg.controller().probe(LogicalLine(17));
    let (tx, rx) = mpsc::channel();
    let first = svc
        .watch(move |slot: PhysicalSlot, level: Level| {
            let _ = tx.send((slot, level));
        })
        .unwrap();
    assert_eq!(
        svc.watch(|_: PhysicalSlot, _: Level| {}).err(),
        Some(GpioError::ObserverAttached)
    );

    probe.edge(Level::High);
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok((PhysicalSlot(11), Level::High)));

    drop(first);
    let (tx, rx) = mpsc::channel();
    let _second = svc
        .watch(move |slot: PhysicalSlot, level: Level| {
            let _ = tx.send((slot, level));
        })
        .unwrap();
    assert!(probe.is_subscribed());
    probe.edge(Level::Low);
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok((PhysicalSlot(11), Level::Low)));
}
