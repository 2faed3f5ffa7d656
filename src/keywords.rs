//! Keyword configuration
//!
//! Holds the three classifier tiers and the named PDF-scan groups in one
//! JSON-loadable structure. Loaded once at startup and shared read-only
//! across the classification and scan phases.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Prefix marking a group as a positive signal for document confirmation.
pub const POSITIVE_PREFIX: &str = "_pos";
/// Prefix marking a group as a negative signal for document confirmation.
pub const NEGATIVE_PREFIX: &str = "_neg";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Tier 1: unambiguous domain-defining phrases. A hit is relevant
    /// regardless of the negative tier.
    #[serde(default)]
    pub strong_positive: Vec<String>,
    /// Tier 2: terms that share word stems with positives but denote a
    /// different topic. A hit (without a tier-1 hit) rejects the record.
    #[serde(default)]
    pub negative: Vec<String>,
    /// Tier 3: looser phrases that count only when tiers 1 and 2 are silent.
    #[serde(default)]
    pub weak_positive: Vec<String>,
    /// PDF-scan groups: name -> alternative keywords. `_pos*`/`_neg*` names
    /// feed the confirmation flag; other names are reported as-is.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Classifier tiers with case folding already applied, built once and
/// shared across all `classify` calls. Tier matching is always
/// case-insensitive, independent of the group `case_sensitive` flag.
#[derive(Debug, Clone)]
pub struct CompiledTiers {
    pub strong_positive: Vec<String>,
    pub negative: Vec<String>,
    pub weak_positive: Vec<String>,
}

impl KeywordConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("failed to read keyword config {:?}: {}", path, e))?;
        serde_json::from_str(&raw)
            .map_err(|e| format!("failed to parse keyword config {:?}: {}", path, e))
    }

    /// Lowercased tier lists, ready for the classifier. Folding happens
    /// once here, not per record.
    pub fn compiled_tiers(&self) -> CompiledTiers {
        let fold = |kws: &[String]| kws.iter().map(|kw| kw.to_lowercase()).collect();
        CompiledTiers {
            strong_positive: fold(&self.strong_positive),
            negative: fold(&self.negative),
            weak_positive: fold(&self.weak_positive),
        }
    }

    /// Group keywords with case folding already applied, ready for the
    /// matcher. Folding happens once here, not per page.
    pub fn compiled_groups(&self) -> BTreeMap<String, Vec<String>> {
        if self.case_sensitive {
            self.groups.clone()
        } else {
            self.groups
                .iter()
                .map(|(name, kws)| {
                    (name.clone(), kws.iter().map(|kw| kw.to_lowercase()).collect())
                })
                .collect()
        }
    }
}

impl Default for KeywordConfig {
    /// The video-understanding configuration the tool ships with. Supply a
    /// JSON file to target a different topic area.
    fn default() -> Self {
        let strong_positive = [
            "action detection",
            "action detector",
            "action recognition",
            "action localization",
            "action quality assessment",
            "video understanding",
            "video recognition",
            "video retrieval",
            "video representation",
            "video grounding",
            "kinetics-400",
            "kinetics 400",
            "kinetics400",
            "k400",
            "kinetics-600",
            "kinetics 600",
            "kinetics600",
            "k600",
            "kinetics-700",
            "kinetics 700",
            "kinetics700",
            "something-something",
            "something something",
        ];
        let negative = [
            "diffraction",
            "action prediction",
            "interaction",
            "object detection",
            "object tracking",
            "distraction",
            "extraction",
            "action assessment",
            "motion prediction",
            "reinforcement learning",
            "segmentation",
            "point cloud",
            "abstraction",
            "action unit recognition",
        ];
        let weak_positive = ["spatio-temporal", "spatial-temporal", "spatiotemporal"];

        let groups: BTreeMap<String, Vec<String>> = [
            (
                "_pos0",
                vec!["kinetics", "something-something", "ntu", "ucf101", "activitynet", "msrvtt"],
            ),
            ("_neg0", vec![]),
            ("mmaction", vec!["mmaction"]),
            ("mmaction2", vec!["mmaction2", "mmaction"]),
            ("openmmlab", vec!["openmmlab", "open mmlab", "open-mmlab"]),
            ("slowfast", vec!["slowfast"]),
            ("pyslowfast", vec!["pyslowfast", "facebookresearch/slowfast"]),
            ("torchvideo", vec!["torchvideo", "torch video"]),
            ("paddlevideo", vec!["paddlevideo", "paddle video"]),
        ]
        .into_iter()
        .map(|(name, kws)| {
            (name.to_string(), kws.into_iter().map(String::from).collect())
        })
        .collect();

        Self {
            strong_positive: strong_positive.iter().map(|s| s.to_string()).collect(),
            negative: negative.iter().map(|s| s.to_string()).collect(),
            weak_positive: weak_positive.iter().map(|s| s.to_string()).collect(),
            groups,
            case_sensitive: false,
        }
    }
}
