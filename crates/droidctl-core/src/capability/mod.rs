//! Input-injection capability variants and the order in which they are probed.
//!
//! # Why two signatures? (for beginners)
//!
//! The OS input manager exposes an internal "inject this event" entry point.
//! Older releases take two arguments `(event, mode)`.  API level 34 added a
//! three-argument form `(event, mode, target_uid)` that lets the caller
//! restrict which process may receive the event.
//!
//! The reported API level alone is not a reliable guide: some builds report
//! 34 but still only ship the old entry point, and some older builds have the
//! new one backported.  So the resolver *probes*: on a new-enough release it
//! tries the three-argument form first and falls back to the legacy one; on
//! older releases it only tries the legacy one.  [`InjectSignature::probe_order`]
//! is the single source of truth for that order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target-process sentinel for the three-argument entry point meaning
/// "any process may receive this event".
pub const TARGET_UID_UNRESTRICTED: i32 = -1;

/// OS API level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SdkLevel(pub u32);

impl SdkLevel {
    /// Android 13.
    pub const TIRAMISU: SdkLevel = SdkLevel(33);
    /// Android 14, the release that introduced the three-argument entry point.
    pub const UPSIDE_DOWN_CAKE: SdkLevel = SdkLevel(34);
}

impl fmt::Display for SdkLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry-point signature variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectSignature {
    /// `(event, mode, target_uid)`.
    WithTargetUid,
    /// `(event, mode)`.
    Legacy,
}

impl InjectSignature {
    /// Signatures to try, in order, on a device reporting `sdk`.
    ///
    /// `targeted_min_sdk` is normally [`SdkLevel::UPSIDE_DOWN_CAKE`]; it is a
    /// parameter so deployments can move the gate for odd vendor builds.
    pub fn probe_order(sdk: SdkLevel, targeted_min_sdk: SdkLevel) -> &'static [InjectSignature] {
        if sdk >= targeted_min_sdk {
            &[InjectSignature::WithTargetUid, InjectSignature::Legacy]
        } else {
            &[InjectSignature::Legacy]
        }
    }

    /// Number of arguments the entry point takes.
    pub fn arity(self) -> usize {
        match self {
            InjectSignature::WithTargetUid => 3,
            InjectSignature::Legacy => 2,
        }
    }
}

/// How long the OS should block the injecting caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectMode {
    /// Return immediately.
    #[default]
    Async,
    /// Wait until the event has been dispatched to a window.
    WaitForResult,
    /// Wait until the receiving window has finished handling it.
    WaitForFinish,
}

impl InjectMode {
    /// The `INJECT_INPUT_EVENT_MODE_*` integer.
    pub fn code(self) -> i32 {
        match self {
            InjectMode::Async => 0,
            InjectMode::WaitForResult => 1,
            InjectMode::WaitForFinish => 2,
        }
    }
}

/// Which optional capabilities applied to one injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityFlags {
    /// The event was tagged with its target display.  `false` means the OS
    /// routed it to its default display.
    pub display_targeted: bool,
}

/// Result of one injection: what the OS reported plus which capabilities
/// were in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectOutcome {
    /// The boolean returned by the entry point.
    pub delivered: bool,
    pub flags: CapabilityFlags,
}

impl InjectOutcome {
    /// Delivered with every capability applied.
    pub fn is_complete(&self) -> bool {
        self.delivered && self.flags.display_targeted
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_order_on_android_14_tries_targeted_first() {
        // Arrange / Act
        let order = InjectSignature::probe_order(SdkLevel(34), SdkLevel::UPSIDE_DOWN_CAKE);

        // Assert
        assert_eq!(order, &[InjectSignature::WithTargetUid, InjectSignature::Legacy]);
    }

    #[test]
    fn test_probe_order_on_android_13_only_tries_legacy() {
        let order = InjectSignature::probe_order(SdkLevel::TIRAMISU, SdkLevel::UPSIDE_DOWN_CAKE);
        assert_eq!(order, &[InjectSignature::Legacy]);
    }

    #[test]
    fn test_probe_order_respects_custom_gate() {
        let order = InjectSignature::probe_order(SdkLevel(33), SdkLevel(33));
        assert_eq!(order[0], InjectSignature::WithTargetUid);
    }

    #[test]
    fn test_arity_matches_variant() {
        assert_eq!(InjectSignature::WithTargetUid.arity(), 3);
        assert_eq!(InjectSignature::Legacy.arity(), 2);
    }

    #[test]
    fn test_inject_mode_codes() {
        assert_eq!(InjectMode::default(), InjectMode::Async);
        assert_eq!(InjectMode::Async.code(), 0);
        assert_eq!(InjectMode::WaitForResult.code(), 1);
        assert_eq!(InjectMode::WaitForFinish.code(), 2);
    }

    #[test]
    fn test_outcome_without_display_targeting_is_not_complete() {
        let outcome = InjectOutcome {
            delivered: true,
            flags: CapabilityFlags { display_targeted: false },
        };
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_inject_mode_deserializes_from_snake_case() {
        let mode: InjectMode = serde_json::from_str("\"wait_for_finish\"").expect("parse");
        assert_eq!(mode, InjectMode::WaitForFinish);
    }
}
