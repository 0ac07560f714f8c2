use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentState {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    Attended => "attended",
    Cancelled => "cancelled",
});

impl AppointmentState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Attended | Self::Cancelled)
    }
}

str_enum!(CommunicationKind {
    Notification => "notification",
    Reminder => "reminder",
    Email => "email",
});

str_enum!(CommunicationChannel {
    Email => "email",
    Sms => "sms",
    Push => "push",
});

str_enum!(ServiceCategory {
    Consultation => "consultation",
    Surgery => "surgery",
    Vaccination => "vaccination",
    Grooming => "grooming",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn state_round_trips_through_str() {
        for state in [
            AppointmentState::Scheduled,
            AppointmentState::Confirmed,
            AppointmentState::Attended,
            AppointmentState::Cancelled,
        ] {
            assert_eq!(AppointmentState::from_str(state.as_str()).unwrap(), state);
        }
    }

    #[test]
    fn unknown_state_is_invalid_enum() {
        let err = AppointmentState::from_str("noshow").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn terminal_states() {
        assert!(!AppointmentState::Scheduled.is_terminal());
        assert!(!AppointmentState::Confirmed.is_terminal());
        assert!(AppointmentState::Attended.is_terminal());
        assert!(AppointmentState::Cancelled.is_terminal());
    }
}
