use std::fmt;

use serde::{Deserialize, Serialize};

/// Commercial price list a client buys on. Each list has its own column in the
/// stock snapshot and its own markup policy rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceList {
    #[serde(rename = "RIV")]
    Riv,
    #[serde(rename = "RIV+10")]
    Riv10,
    #[serde(rename = "DIST")]
    Dist,
}

impl PriceList {
    /// Maps the label found in the client master data to a price list.
    /// Unrecognized labels fall back to the reseller list, matching how the
    /// commercial team fills the sheet.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "LISTINO RI+10%" => Self::Riv10,
            "LISTINO DI" => Self::Dist,
            _ => Self::Riv,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Riv => "RIV",
            Self::Riv10 => "RIV+10",
            Self::Dist => "DIST",
        }
    }
}

impl fmt::Display for PriceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer, loaded once per quote session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub name: String,
    pub price_list: PriceList,
    pub category: String,
}
