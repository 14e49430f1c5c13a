/// Nominal voltage of a fully charged device cell.
pub const DEFAULT_FULL_VOLTAGE: f64 = 3.30;

/// Voltage assumed when a poll does not report one.
pub const DEFAULT_REPORTED_VOLTAGE: f64 = 3.3;

/// Linear battery estimate, truncated and clamped to `0..=100`.
pub fn battery_percent(voltage: f64, full_voltage: f64) -> u8 {
    if !voltage.is_finite() || full_voltage <= 0.0 {
        return 0;
    }
    let percent = (voltage / full_voltage * 100.0).floor();
    percent.clamp(0.0, 100.0) as u8
}
