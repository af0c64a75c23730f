//! Label reference records

use serde::{Deserialize, Serialize};

/// The fixed set of label types tracked in the reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelCategory {
    #[serde(rename = "봉합라벨")]
    Seal,
    #[serde(rename = "리실러블라벨")]
    Resealable,
    #[serde(rename = "용기라벨")]
    Container,
    #[serde(rename = "상단라벨")]
    Top,
    #[serde(rename = "용기전면라벨")]
    ContainerFront,
    #[serde(rename = "용기후면라벨")]
    ContainerBack,
    #[serde(rename = "용기상단라벨")]
    ContainerTop,
    #[serde(rename = "용기우측라벨")]
    ContainerRight,
    #[serde(rename = "용기좌측라벨")]
    ContainerLeft,
    #[serde(rename = "엠블럼")]
    Emblem,
    #[serde(rename = "실링지")]
    SealingPaper,
    #[serde(rename = "덧방라벨")]
    Overlay,
}

impl LabelCategory {
    pub const ALL: [LabelCategory; 12] = [
        LabelCategory::Seal,
        LabelCategory::Resealable,
        LabelCategory::Container,
        LabelCategory::Top,
        LabelCategory::ContainerFront,
        LabelCategory::ContainerBack,
        LabelCategory::ContainerTop,
        LabelCategory::ContainerRight,
        LabelCategory::ContainerLeft,
        LabelCategory::Emblem,
        LabelCategory::SealingPaper,
        LabelCategory::Overlay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LabelCategory::Seal => "봉합라벨",
            LabelCategory::Resealable => "리실러블라벨",
            LabelCategory::Container => "용기라벨",
            LabelCategory::Top => "상단라벨",
            LabelCategory::ContainerFront => "용기전면라벨",
            LabelCategory::ContainerBack => "용기후면라벨",
            LabelCategory::ContainerTop => "용기상단라벨",
            LabelCategory::ContainerRight => "용기우측라벨",
            LabelCategory::ContainerLeft => "용기좌측라벨",
            LabelCategory::Emblem => "엠블럼",
            LabelCategory::SealingPaper => "실링지",
            LabelCategory::Overlay => "덧방라벨",
        }
    }
}

impl std::fmt::Display for LabelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for LabelCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        LabelCategory::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| {
                let options: Vec<&str> = LabelCategory::ALL.iter().map(|c| c.label()).collect();
                format!("Invalid label category: {}. Use one of: {}", s, options.join(", "))
            })
    }
}

/// One row of the label reference table
///
/// Weights are grams, dimensions millimetres. A zero core weight means the
/// core was never weighed and the estimate stands in for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub sample_no: String,
    pub part: String,
    pub name: String,
    /// Free-text entries created by hand have no category
    pub category: Option<LabelCategory>,
    pub core_weight: f64,
    pub estimated_weight: f64,
    pub error: f64,
    pub outer_diameter: f64,
    pub inner_diameter: f64,
    pub height: f64,
    pub roll_weight: Option<f64>,
    /// Reference sample description, e.g. "2매(아이마크)"
    pub reference_sample: String,
    pub sample_weight: f64,
}

impl LabelRecord {
    pub fn category_label(&self) -> &'static str {
        self.category.map(LabelCategory::label).unwrap_or("")
    }
}
