use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Vetagenda";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory (~/Vetagenda on all platforms)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Vetagenda")
}

/// Default path of the clinic database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Scheduling and delivery policy, explicitly constructed and passed into
/// the coordinator and ledger — no process-wide singleton.
#[derive(Debug, Clone)]
pub struct ClinicConfig {
    /// How long before the appointment the reminder should go out.
    pub reminder_lead_hours: i64,
    /// Also enqueue a creation notification alongside the reminder.
    pub notify_on_creation: bool,
    /// Delivery attempt budget per communication.
    pub max_delivery_attempts: u32,
    /// Bounded retries of the read-transition-write cycle when a
    /// compare-and-swap loses to a concurrent transition.
    pub max_transition_retries: u32,
    /// Fractional surcharge applied to emergency bookings (0.5 = +50%).
    pub emergency_surcharge: f64,
    /// Fractional surcharge for Saturday/Sunday bookings.
    pub weekend_surcharge: f64,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            reminder_lead_hours: 24,
            notify_on_creation: true,
            max_delivery_attempts: 3,
            max_transition_retries: 3,
            emergency_surcharge: 0.5,
            weekend_surcharge: 0.15,
        }
    }
}
