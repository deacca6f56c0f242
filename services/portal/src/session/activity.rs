//! User activity signals that keep a session alive

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Input events recognized as user activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    /// All recognized signals
    pub const ALL: [ActivitySignal; 5] = [
        ActivitySignal::PointerDown,
        ActivitySignal::KeyDown,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
        ActivitySignal::Click,
    ];

    /// Get the canonical event name
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySignal::PointerDown => "pointerdown",
            ActivitySignal::KeyDown => "keydown",
            ActivitySignal::Scroll => "scroll",
            ActivitySignal::TouchStart => "touchstart",
            ActivitySignal::Click => "click",
        }
    }
}

impl fmt::Display for ActivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event name that is not an activity signal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not an activity signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for ActivitySignal {
    type Err = UnknownSignal;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "pointerdown" | "mousedown" => Ok(ActivitySignal::PointerDown),
            "keydown" => Ok(ActivitySignal::KeyDown),
            "scroll" => Ok(ActivitySignal::Scroll),
            "touchstart" => Ok(ActivitySignal::TouchStart),
            "click" => Ok(ActivitySignal::Click),
            _ => Err(UnknownSignal(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_names() {
        assert_eq!("mousedown".parse(), Ok(ActivitySignal::PointerDown));
        assert_eq!("pointer-down".parse(), Ok(ActivitySignal::PointerDown));
        assert_eq!("KeyDown".parse(), Ok(ActivitySignal::KeyDown));
        assert_eq!("touch_start".parse(), Ok(ActivitySignal::TouchStart));
        assert_eq!(
            "mousemove".parse::<ActivitySignal>(),
            Err(UnknownSignal("mousemove".to_string()))
        );
    }

    #[test]
    fn test_unknown_signal_message() {
        let err = "wheel".parse::<ActivitySignal>().unwrap_err();
        assert_eq!(err.to_string(), "not an activity signal: wheel");
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for signal in ActivitySignal::ALL {
            assert_eq!(signal.as_str().parse(), Ok(signal));
        }
    }
}
