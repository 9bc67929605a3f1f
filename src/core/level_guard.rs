//! Level gating
//!
//! A [`LevelGuard`] is selected from a node's config whenever the config
//! changes. It answers "would a call at this level do anything" without
//! touching the event pool or the sink, so disabled calls cost one compare.

use super::config::Config;
use super::log_level::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelGuard {
    /// Everything is disabled
    Nop,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LevelGuard {
    pub const fn from_level(level: Option<LogLevel>) -> Self {
        match level {
            None => LevelGuard::Nop,
            Some(LogLevel::Trace) => LevelGuard::Trace,
            Some(LogLevel::Debug) => LevelGuard::Debug,
            Some(LogLevel::Info) => LevelGuard::Info,
            Some(LogLevel::Warn) => LevelGuard::Warn,
            Some(LogLevel::Error) => LevelGuard::Error,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_level(config.level)
    }

    /// Lowest level that passes this guard
    pub const fn bound(&self) -> Option<LogLevel> {
        match self {
            LevelGuard::Nop => None,
            LevelGuard::Trace => Some(LogLevel::Trace),
            LevelGuard::Debug => Some(LogLevel::Debug),
            LevelGuard::Info => Some(LogLevel::Info),
            LevelGuard::Warn => Some(LogLevel::Warn),
            LevelGuard::Error => Some(LogLevel::Error),
        }
    }

    #[inline]
    pub const fn is_enabled(&self, requested: LogLevel) -> bool {
        match self.bound() {
            Some(bound) => requested as u8 >= bound as u8,
            None => false,
        }
    }

    #[inline]
    pub const fn is_trace_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Trace)
    }

    #[inline]
    pub const fn is_debug_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Debug)
    }

    #[inline]
    pub const fn is_info_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Info)
    }

    #[inline]
    pub const fn is_warn_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Warn)
    }

    #[inline]
    pub const fn is_error_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_disables_everything() {
        let guard = LevelGuard::from_level(None);
        assert_eq!(guard, LevelGuard::Nop);
        for level in LogLevel::ALL {
            assert!(!guard.is_enabled(level));
        }
    }

    #[test]
    fn test_bound_is_inclusive() {
        let guard = LevelGuard::from_level(Some(LogLevel::Warn));
        assert!(!guard.is_info_enabled());
        assert!(guard.is_warn_enabled());
        assert!(guard.is_error_enabled());
    }

    #[test]
    fn test_every_level_selects_matching_guard() {
        for level in LogLevel::ALL {
            let guard = LevelGuard::from_level(Some(level));
            assert_eq!(guard.bound(), Some(level));
            for requested in LogLevel::ALL {
                assert_eq!(guard.is_enabled(requested), requested >= level);
            }
        }
    }

    #[test]
    fn test_from_config() {
        let config = Config::default().with_level(LogLevel::Trace);
        assert!(LevelGuard::from_config(&config).is_trace_enabled());
        assert_eq!(LevelGuard::from_config(&config.disabled()), LevelGuard::Nop);
    }
}
