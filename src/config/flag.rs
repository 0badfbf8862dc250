//! Boolean switches consulted by the pipeline.
//!
//! Stages never reach into the config directly. A [`Flags`] snapshot is taken
//! once per transformation from any [`FlagSource`], so every flag is read at
//! most once per run and the run sees a consistent view.

use super::section::OptimizerConfig;

/// A pipeline switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Enable,
    Performance,
    ProgressiveLoading,
    ImageOptimization,
    JsOptimization,
    WebWorker,
    CriticalPath,
    Http2Push,
}

impl Flag {
    pub const ALL: [Self; 8] = [
        Self::Enable,
        Self::Performance,
        Self::ProgressiveLoading,
        Self::ImageOptimization,
        Self::JsOptimization,
        Self::WebWorker,
        Self::CriticalPath,
        Self::Http2Push,
    ];

    /// TOML key under `[optimizer]`.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Performance => "performance",
            Self::ProgressiveLoading => "progressive_loading",
            Self::ImageOptimization => "image_optimization",
            Self::JsOptimization => "js_optimization",
            Self::WebWorker => "web_worker",
            Self::CriticalPath => "critical_path",
            Self::Http2Push => "http2_push",
        }
    }

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Anything that can answer flag lookups.
pub trait FlagSource {
    fn flag(&self, flag: Flag) -> bool;
}

impl FlagSource for OptimizerConfig {
    fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::Enable => self.enable,
            Flag::Performance => self.performance,
            Flag::ProgressiveLoading => self.progressive_loading,
            Flag::ImageOptimization => self.image_optimization,
            Flag::JsOptimization => self.js_optimization,
            Flag::WebWorker => self.web_worker,
            Flag::CriticalPath => self.critical_path,
            Flag::Http2Push => self.http2_push,
        }
    }
}

/// Immutable snapshot of every [`Flag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    bits: u16,
}

impl Flags {
    /// Read each flag from `source` exactly once.
    pub fn snapshot(source: &(impl FlagSource + ?Sized)) -> Self {
        let bits = Flag::ALL
            .iter()
            .filter(|flag| source.flag(**flag))
            .fold(0, |bits, flag| bits | flag.bit());
        Self { bits }
    }

    /// Every flag on.
    pub fn all() -> Self {
        Self {
            bits: Flag::ALL.iter().fold(0, |bits, flag| bits | flag.bit()),
        }
    }

    #[inline]
    pub const fn get(self, flag: Flag) -> bool {
        self.bits & flag.bit() != 0
    }

    /// Copy with one flag changed.
    #[must_use]
    pub const fn with(self, flag: Flag, on: bool) -> Self {
        let bits = if on {
            self.bits | flag.bit()
        } else {
            self.bits & !flag.bit()
        };
        Self { bits }
    }
}

impl FlagSource for Flags {
    fn flag(&self, flag: Flag) -> bool {
        self.get(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CountingSource {
        reads: RefCell<Vec<Flag>>,
    }

    impl FlagSource for CountingSource {
        fn flag(&self, flag: Flag) -> bool {
            self.reads.borrow_mut().push(flag);
            matches!(flag, Flag::Enable | Flag::WebWorker)
        }
    }

    #[test]
    fn test_snapshot_reads_each_flag_once() {
        let source = CountingSource {
            reads: RefCell::new(Vec::new()),
        };
        let flags = Flags::snapshot(&source);

        let reads = source.reads.borrow();
        assert_eq!(reads.len(), Flag::ALL.len());
        for flag in Flag::ALL {
            assert_eq!(reads.iter().filter(|f| **f == flag).count(), 1);
        }

        assert!(flags.get(Flag::Enable));
        assert!(flags.get(Flag::WebWorker));
        assert!(!flags.get(Flag::Performance));
    }

    #[test]
    fn test_snapshot_matches_config() {
        let config = OptimizerConfig::default();
        let flags = Flags::snapshot(&config);
        for flag in Flag::ALL {
            assert_eq!(flags.get(flag), config.flag(flag), "{}", flag.key());
        }
    }

    #[test]
    fn test_with_and_all() {
        let flags = Flags::default().with(Flag::CriticalPath, true);
        assert!(flags.get(Flag::CriticalPath));
        assert!(!flags.with(Flag::CriticalPath, false).get(Flag::CriticalPath));
        assert!(Flag::ALL.iter().all(|f| Flags::all().get(*f)));
    }
}
