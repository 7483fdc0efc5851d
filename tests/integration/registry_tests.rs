//! Registry start-up against the mock controller.

use super::mock_hw::MockController;

use gpiotool::app::ports::LineHandle;
use gpiotool::error::{GpioError, HwError};
use gpiotool::line::LineAccessor;
use gpiotool::pins::{HeaderVariant, RPI_40PIN};
use gpiotool::registry::LineRegistry;
use gpiotool::types::{DriveMode, Level, LogicalLine, PhysicalSlot};

#[test]
fn every_table_line_is_opened_exactly_once() {
    let ctrl = MockController::new(28);
    let probes: Vec<_> = (0..28u8).map(|l| (l, ctrl.probe(LogicalLine(l)))).collect();
    let reg = LineRegistry::initialize(Some(ctrl), &RPI_40PIN).unwrap();

    let mapped: Vec<u8> = RPI_40PIN.lines().map(|(_, line)| line.0).collect();
    for (line, probe) in &probes {
        let expected = u32::from(mapped.contains(line));
        assert_eq!(probe.opens(), expected, "GPIO {} opened {} times", line, probe.opens());
    }
    assert_eq!(reg.mapped().count(), 24);
}

#[test]
fn no_controller_means_no_registry() {
    assert_eq!(
        LineRegistry::<MockController>::initialize(None, &RPI_40PIN).err(),
        Some(GpioError::ControllerUnavailable)
    );
}

#[test]
fn one_failed_open_leaves_the_rest_usable() {
    let ctrl = MockController::new(28).refuse_open(LogicalLine(22), HwError::Os(16));
    let reg = LineRegistry::initialize(Some(ctrl), &RPI_40PIN).unwrap();
    let acc = LineAccessor::default();

    let broken = reg.get_by_physical(PhysicalSlot(15)).unwrap();
    assert_eq!(broken.open_error(), Some(HwError::Os(16)));
    assert_eq!(
        acc.read_level(broken),
        Err(GpioError::LineNotOpen(LogicalLine(22)))
    );

    let neighbour = reg.get_by_physical(PhysicalSlot(16)).unwrap();
    acc.set_drive_mode(neighbour, DriveMode::Output).unwrap();
    acc.write_level(neighbour, Level::High).unwrap();
    assert_eq!(acc.read_level(neighbour), Ok(Level::High));
}

#[test]
fn read_failures_surface_to_the_caller() {
    let ctrl = MockController::new(28);
    let probe = ctrl.probe(LogicalLine(5));
    let reg = LineRegistry::initialize(Some(ctrl), &RPI_40PIN).unwrap();
    probe.fail_reads(true);
    let rec = reg.get_by_logical(LogicalLine(5)).unwrap();
    assert_eq!(
        LineAccessor::default().read_level(rec),
        Err(GpioError::Hardware(HwError::ReadFailed))
    );
    assert_eq!(rec.handle().unwrap().drive_mode(), Ok(DriveMode::Input));
}

#[test]
fn full_variant_opens_the_uart_lines() {
    let ctrl = MockController::new(28);
    let uart = ctrl.probe(LogicalLine(14));
    let reg = LineRegistry::initialize(Some(ctrl), HeaderVariant::Rpi40PinFull.layout()).unwrap();
    assert_eq!(uart.opens(), 1);
    assert_eq!(reg.mapped().count(), 26);
    assert_eq!(
        reg.get_by_physical(PhysicalSlot(8)).unwrap().line(),
        Some(LogicalLine(14))
    );
}
