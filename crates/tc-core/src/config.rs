//! Analysis configuration and the `key=value` token-stream parser.
//!
//! Configuration strings arrive from the steering framework as
//! whitespace-delimited tokens (`"minTriggerPt=8.0 triggertype=pi0"`).
//! Unrecognized tokens are logged and ignored; the run proceeds with the
//! remaining settings.

use serde::{Deserialize, Serialize};

/// Collision system selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionSystem {
    /// Proton–proton.
    Pp,
    /// Lead–lead.
    PbPb,
    /// Proton–lead.
    PPb,
}

/// Which structural kind is accepted as the trigger particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Charged tracks trigger.
    Tracks,
    /// Neutral pi0-like candidates trigger.
    Pi0,
}

/// Angular binning granularity for the correlation containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngularBinning {
    /// 63 Δη bins × 38 Δφ bins.
    Fine,
    /// 31 Δη bins × 18 Δφ bins.
    Coarse,
}

impl AngularBinning {
    /// (Δη bins, Δφ bins) for this granularity.
    pub fn bins(self) -> (usize, usize) {
        match self {
            AngularBinning::Fine => (63, 38),
            AngularBinning::Coarse => (31, 18),
        }
    }
}

/// Full configuration of one correlation accumulator.
///
/// Defaults reproduce the standard analysis: trigger window 8–15 GeV/c,
/// associated window 3–8 GeV/c, |η| acceptance 0.8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Lower trigger-pt cut (candidates at or below are rejected).
    pub min_trigger_pt: f64,
    /// Upper trigger-pt cut; enforced only when greater than the minimum.
    pub max_trigger_pt: f64,
    /// Lower associated-pt cut.
    pub min_associated_pt: f64,
    /// Upper associated-pt cut; enforced only when greater than the minimum.
    pub max_associated_pt: f64,
    /// Single-particle |η| acceptance; the Δη axes span ±2× this value.
    pub acceptance_cut: f64,
    /// Collision system selector.
    pub collision: CollisionSystem,
    /// Trigger-kind selector.
    pub trigger: TriggerKind,
    /// Angular binning granularity.
    pub binning: AngularBinning,
    /// Mixed-event normalization floor: the peak low-angle cell must exceed
    /// this content for a mixed view to be scaled; otherwise the view is
    /// zeroed.
    pub mixed_norm_floor: f64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            min_trigger_pt: 8.0,
            max_trigger_pt: 15.0,
            min_associated_pt: 3.0,
            max_associated_pt: 8.0,
            acceptance_cut: 0.8,
            collision: CollisionSystem::PbPb,
            trigger: TriggerKind::Tracks,
            binning: AngularBinning::Fine,
            mixed_norm_floor: 1.0,
        }
    }
}

impl CorrelatorConfig {
    /// Parse a whitespace-delimited `key=value` token stream on top of the
    /// defaults. Unknown keys and malformed values are logged and skipped.
    pub fn from_tokens(arguments: &str) -> Self {
        let mut cfg = Self::default();
        cfg.apply_tokens(arguments);
        cfg
    }

    /// Apply a token stream to an existing configuration.
    pub fn apply_tokens(&mut self, arguments: &str) {
        for token in arguments.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                log::warn!("ignoring config token without '=': '{token}'");
                continue;
            };
            match key {
                "minTriggerPt" => {
                    if let Some(v) = parse_float(key, value) {
                        self.min_trigger_pt = v;
                    }
                }
                "maxTriggerPt" => {
                    if let Some(v) = parse_float(key, value) {
                        self.max_trigger_pt = v;
                    }
                }
                "minAssociatedPt" => {
                    if let Some(v) = parse_float(key, value) {
                        self.min_associated_pt = v;
                    }
                }
                "maxAssociatedPt" => {
                    if let Some(v) = parse_float(key, value) {
                        self.max_associated_pt = v;
                    }
                }
                "collisiontype" => match value {
                    "pp" => self.collision = CollisionSystem::Pp,
                    "PbPb" => self.collision = CollisionSystem::PbPb,
                    "pPb" => self.collision = CollisionSystem::PPb,
                    other => log::warn!("unknown collisiontype '{other}', keeping {:?}", self.collision),
                },
                "triggertype" => match value {
                    "tracks" => self.trigger = TriggerKind::Tracks,
                    "pi0" => self.trigger = TriggerKind::Pi0,
                    other => log::warn!("unknown triggertype '{other}', keeping {:?}", self.trigger),
                },
                other => log::warn!("ignoring unknown config token '{other}={value}'"),
            }
        }
    }

    /// Human-readable trigger-pt window, e.g. `"8.00 < pt < 15.00"` or
    /// `"pt > 8.00"` when no upper bound is enforced.
    pub fn trigger_pt_label(&self) -> String {
        pt_label(self.min_trigger_pt, self.max_trigger_pt)
    }

    /// Human-readable associated-pt window.
    pub fn associated_pt_label(&self) -> String {
        pt_label(self.min_associated_pt, self.max_associated_pt)
    }

    /// Upper edge used for trigger-pt spectra axes.
    pub fn trigger_pt_cap(&self) -> f64 {
        if self.max_trigger_pt > self.min_trigger_pt {
            self.max_trigger_pt
        } else {
            self.min_trigger_pt
        }
    }

    /// Upper edge used for associated-pt spectra axes.
    pub fn associated_pt_cap(&self) -> f64 {
        if self.max_associated_pt > self.min_associated_pt {
            self.max_associated_pt
        } else {
            self.min_associated_pt
        }
    }
}

fn parse_float(key: &str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring malformed value for '{key}': '{value}'");
            None
        }
    }
}

fn pt_label(min: f64, max: f64) -> String {
    if max > min {
        format!("{min:.2} < pt < {max:.2}")
    } else {
        format!("pt > {min:.2}")
    }
}
