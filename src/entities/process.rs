//! Production lines a return can come back from

use serde::{Deserialize, Serialize};

/// Fixed production line (floor + line type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Process {
    #[serde(rename = "4층 덕용")]
    Floor4Bulk,
    #[serde(rename = "4층 로터리")]
    Floor4Rotary,
    #[serde(rename = "4층 블리스터")]
    Floor4Blister,
    #[serde(rename = "5층 덕용")]
    Floor5Bulk,
    #[serde(rename = "5층 기초")]
    Floor5Basic,
    #[serde(rename = "6층 스틱")]
    Floor6Stick,
    #[serde(rename = "6층 파우치")]
    Floor6Pouch,
    #[serde(rename = "6층 스킨팩")]
    Floor6SkinPack,
}

impl Process {
    pub const ALL: [Process; 8] = [
        Process::Floor4Bulk,
        Process::Floor4Rotary,
        Process::Floor4Blister,
        Process::Floor5Bulk,
        Process::Floor5Basic,
        Process::Floor6Stick,
        Process::Floor6Pouch,
        Process::Floor6SkinPack,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Process::Floor4Bulk => "4층 덕용",
            Process::Floor4Rotary => "4층 로터리",
            Process::Floor4Blister => "4층 블리스터",
            Process::Floor5Bulk => "5층 덕용",
            Process::Floor5Basic => "5층 기초",
            Process::Floor6Stick => "6층 스틱",
            Process::Floor6Pouch => "6층 파우치",
            Process::Floor6SkinPack => "6층 스킨팩",
        }
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Process {
    type Err = String;

    /// Accepts the Korean label with or without the space ("5층기초")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Process::ALL
            .into_iter()
            .find(|p| p.label().replace(' ', "") == wanted)
            .ok_or_else(|| {
                let options: Vec<&str> = Process::ALL.iter().map(|p| p.label()).collect();
                format!("Invalid process: {}. Use one of: {}", s, options.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_parse_and_display() {
        assert_eq!("6층 스킨팩".parse::<Process>(), Ok(Process::Floor6SkinPack));
        assert_eq!("5층기초".parse::<Process>(), Ok(Process::Floor5Basic));
        assert_eq!(Process::Floor4Rotary.to_string(), "4층 로터리");
        assert!("7층 덕용".parse::<Process>().is_err());
    }

    #[test]
    fn test_process_serde_uses_label() {
        let json = serde_json::to_string(&Process::Floor6Pouch).unwrap();
        assert_eq!(json, "\"6층 파우치\"");
        let back: Process = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Process::Floor6Pouch);
    }
}
