//! Pulse controller timing and lifecycle against the mock controller.

use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use super::mock_hw::{MockController, MockProbe};

use gpiotool::error::{GpioError, HwError};
use gpiotool::line::WritePolicy;
use gpiotool::pins::RPI_40PIN;
use gpiotool::pulse::{CancelCheck, PulseController, PulseStatus, PulseTiming};
use gpiotool::registry::LineRegistry;
use gpiotool::types::{Level, LogicalLine};

fn setup(check: CancelCheck, line: LogicalLine) -> (PulseController<MockController>, MockProbe) {
    let ctrl = MockController::new(28);
    let probe = ctrl.probe(line);
    let reg = Arc::new(LineRegistry::initialize(Some(ctrl), &RPI_40PIN).unwrap());
    (PulseController::new(reg, check, WritePolicy::Permissive), probe)
}

fn timing(low: i64, high: i64) -> PulseTiming {
    PulseTiming::from_millis(low, high).unwrap()
}

#[test]
fn square_wave_alternates_starting_low() {
    let (ctl, probe) = setup(CancelCheck::EachPhase, LogicalLine(17));
    let t0 = Instant::now();
    ctl.start(LogicalLine(17), timing(100, 200)).unwrap();
    sleep(Duration::from_millis(1050));

    let writes = probe.writes();
    let by_1050: Vec<_> = writes
        .iter()
        .filter(|w| w.at.duration_since(t0) <= Duration::from_millis(1050))
        .collect();
    let lows = by_1050.iter().filter(|w| w.level == Level::Low).count();
    let highs = by_1050.iter().filter(|w| w.level == Level::High).count();
    assert!(lows >= 3, "only {} low phases", lows);
    assert!(highs >= 3, "only {} high phases", highs);

    assert_eq!(writes[0].level, Level::Low);
    for pair in writes.windows(2) {
        assert_ne!(pair[0].level, pair[1].level, "phases must alternate");
    }

    let report = ctl.stop().unwrap();
    assert!(report.cycles >= 3);
    assert_eq!(report.line, LogicalLine(17));
}

#[test]
fn no_writes_after_stop_returns() {
    let (ctl, probe) = setup(CancelCheck::EachPhase, LogicalLine(27));
    ctl.start(LogicalLine(27), timing(100, 200)).unwrap();
    sleep(Duration::from_millis(250));
    ctl.stop().unwrap();

    let settled = probe.write_count();
    sleep(Duration::from_millis(300));
    assert_eq!(probe.write_count(), settled);
    assert_eq!(ctl.status(), PulseStatus::Idle);
}

#[test]
fn stop_latency_is_bounded_by_the_longest_phase() {
    let (ctl, _probe) = setup(CancelCheck::EachPhase, LogicalLine(23));
    let t = timing(50, 150);
    ctl.start(LogicalLine(23), t).unwrap();
    sleep(Duration::from_millis(20));
    let asked = Instant::now();
    ctl.stop().unwrap();
    let waited = asked.elapsed();
    assert!(
        waited <= t.stop_latency(CancelCheck::EachPhase) + Duration::from_millis(100),
        "stop took {:?}",
        waited
    );
}

#[test]
fn cycle_start_check_always_ends_high() {
    let (ctl, probe) = setup(CancelCheck::CycleStart, LogicalLine(24));
    ctl.start(LogicalLine(24), timing(40, 40)).unwrap();
    sleep(Duration::from_millis(10));
    ctl.stop().unwrap();
    let writes = probe.writes();
    assert_eq!(writes.len() % 2, 0, "a cycle was cut short: {:?}", writes);
    assert_eq!(writes.last().map(|w| w.level), Some(Level::High));
}

#[test]
fn phases_hold_for_their_intervals() {
    let (ctl, probe) = setup(CancelCheck::EachPhase, LogicalLine(22));
    let t = timing(40, 80);
    let started = Instant::now();
    ctl.start(LogicalLine(22), t).unwrap();
    sleep(Duration::from_millis(630));
    let report = ctl.stop().unwrap();
    let ran = started.elapsed();

    let writes = probe.writes();
    assert!(writes.len() >= 8, "only {} writes", writes.len());

    // Timers never fire early; allow for scheduler lateness only.
    let slack = Duration::from_millis(1);
    let late = Duration::from_millis(40);
    for pair in writes.windows(2) {
        let held = pair[1].at.duration_since(pair[0].at);
        let phase = match pair[0].level {
            Level::Low => t.low(),
            Level::High => t.high(),
        };
        assert!(held + slack >= phase, "{} held {:?}, want {:?}", pair[0].level, held, phase);
        assert!(held <= phase + late, "{} held {:?}, want {:?}", pair[0].level, held, phase);
    }

    let whole = (writes.len() - 1) / 2;
    let span = writes[2 * whole].at.duration_since(writes[0].at);
    let expected = t.period() * whole as u32;
    assert!(span + slack >= expected, "{} cycles took {:?}", whole, span);
    assert!(span <= expected + late * 2, "{} cycles took {:?}", whole, span);

    let most = ran.as_millis() / t.period().as_millis() + 1;
    assert!(u128::from(report.cycles) <= most, "{} cycles in {:?}", report.cycles, ran);
    assert!(report.cycles >= 4, "{} cycles in {:?}", report.cycles, ran);
}

#[test]
fn stop_does_not_wait_out_a_long_phase() {
    let (ctl, probe) = setup(CancelCheck::EachPhase, LogicalLine(25));
    ctl.start(LogicalLine(25), timing(20, 5000)).unwrap();
    sleep(Duration::from_millis(100));
    assert_eq!(probe.writes().last().map(|w| w.level), Some(Level::High));

    let asked = Instant::now();
    let report = ctl.stop().unwrap();
    assert!(asked.elapsed() < Duration::from_millis(500), "stop took {:?}", asked.elapsed());
    assert_eq!(report.cycles, 1);
    assert_eq!(probe.write_count(), 2);
    assert_eq!(ctl.status(), PulseStatus::Idle);
}

#[test]
fn start_while_running_is_rejected_then_allowed_after_stop() {
    let (ctl, _probe) = setup(CancelCheck::EachPhase, LogicalLine(17));
    ctl.start(LogicalLine(17), timing(10, 10)).unwrap();
    assert_eq!(
        ctl.start(LogicalLine(17), timing(10, 10)),
        Err(GpioError::AlreadyRunning(LogicalLine(17)))
    );
    ctl.stop().unwrap();
    ctl.start(LogicalLine(17), timing(10, 10)).unwrap();
    assert!(ctl.is_pulsing(LogicalLine(17)));
    ctl.stop().unwrap();
}

#[test]
fn hardware_failure_mid_run_is_reported_by_stop() {
    let (ctl, probe) = setup(CancelCheck::EachPhase, LogicalLine(12));
    probe.fail_writes_after(3);
    ctl.start(LogicalLine(12), timing(5, 5)).unwrap();
    sleep(Duration::from_millis(100));
    assert_eq!(probe.write_count(), 3);
    assert_eq!(ctl.status(), PulseStatus::Faulted { line: LogicalLine(12) });
    assert_eq!(ctl.stop(), Err(GpioError::Hardware(HwError::WriteFailed)));
    assert_eq!(ctl.stop(), Err(GpioError::NoActiveJob));
}

#[test]
fn unknown_line_never_starts() {
    let (ctl, _probe) = setup(CancelCheck::EachPhase, LogicalLine(17));
    assert_eq!(
        ctl.start(LogicalLine(15), timing(10, 10)),
        Err(GpioError::LineNotFound(LogicalLine(15)))
    );
    assert_eq!(ctl.status(), PulseStatus::Idle);
}
