//! Event-name vocabulary for the trailpack lifecycle.
//!
//! Spellings are part of the contract between packs: a pack's `listen`
//! lists name other packs' completion events by these exact strings, so
//! they must never drift.

use serde::{Deserialize, Serialize};

/// Emitted by the host to kick off startup; every pack's validate phase
/// waits on it.
pub const TRAILS_START: &str = "trails:start";

/// Emitted exactly once, after every pack has initialized.
pub const TRAILS_READY: &str = "trails:ready";

/// Aggregate: every pack has validated.
pub const ALL_VALIDATED: &str = "trailpack:all:validated";

/// Aggregate: every pack has configured.
pub const ALL_CONFIGURED: &str = "trailpack:all:configured";

/// Aggregate: every pack has initialized.
pub const ALL_INITIALIZED: &str = "trailpack:all:initialized";

/// The three sequential stages each trailpack passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Validate,
    Configure,
    Initialize,
}

impl Phase {
    /// Past-tense suffix used in completion event names.
    pub fn completed(&self) -> &'static str {
        match self {
            Self::Validate => "validated",
            Self::Configure => "configured",
            Self::Initialize => "initialized",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validate => "validate",
            Self::Configure => "configure",
            Self::Initialize => "initialize",
        };
        write!(f, "{s}")
    }
}

/// Completion event for a single pack, e.g. `trailpack:web:validated`.
pub fn pack_event(pack: &str, phase: Phase) -> String {
    format!("trailpack:{pack}:{}", phase.completed())
}

/// Aggregate completion event for a phase.
pub fn all_event(phase: Phase) -> &'static str {
    match phase {
        Phase::Validate => ALL_VALIDATED,
        Phase::Configure => ALL_CONFIGURED,
        Phase::Initialize => ALL_INITIALIZED,
    }
}

/// Parse a per-pack completion event back into `(pack, phase)`.
/// Aggregate (`all`) events and unrelated names return `None`.
pub fn parse_pack_event(event: &str) -> Option<(&str, Phase)> {
    let rest = event.strip_prefix("trailpack:")?;
    let (pack, suffix) = rest.rsplit_once(':')?;
    if pack == "all" || pack.is_empty() {
        return None;
    }
    let phase = match suffix {
        "validated" => Phase::Validate,
        "configured" => Phase::Configure,
        "initialized" => Phase::Initialize,
        _ => return None,
    };
    Some((pack, phase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_event_spelling() {
        assert_eq!(pack_event("auth", Phase::Validate), "trailpack:auth:validated");
        assert_eq!(pack_event("auth", Phase::Configure), "trailpack:auth:configured");
        assert_eq!(pack_event("auth", Phase::Initialize), "trailpack:auth:initialized");
    }

    #[test]
    fn all_event_spelling() {
        assert_eq!(all_event(Phase::Validate), "trailpack:all:validated");
        assert_eq!(all_event(Phase::Configure), "trailpack:all:configured");
        assert_eq!(all_event(Phase::Initialize), "trailpack:all:initialized");
    }

    #[test]
    fn parse_roundtrip() {
        for phase in [Phase::Validate, Phase::Configure, Phase::Initialize] {
            let event = pack_event("policy", phase);
            assert_eq!(parse_pack_event(&event), Some(("policy", phase)));
        }
    }

    #[test]
    fn parse_rejects_aggregates_and_noise() {
        assert_eq!(parse_pack_event(ALL_VALIDATED), None);
        assert_eq!(parse_pack_event(TRAILS_READY), None);
        assert_eq!(parse_pack_event("trailpack:auth:exploded"), None);
        assert_eq!(parse_pack_event("trailpack:"), None);
    }

    #[test]
    fn phase_display_is_present_tense() {
        assert_eq!(Phase::Validate.to_string(), "validate");
        assert_eq!(Phase::Initialize.to_string(), "initialize");
    }
}
