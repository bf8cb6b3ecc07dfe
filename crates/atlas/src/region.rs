use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The seven states and territories the store partitions daily records
/// by. Each region owns one table; the same raw station id appearing in
/// two tables denotes two different physical stations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Vic,
    Nsw,
    Qld,
    Wa,
    Sa,
    Tas,
    Nt,
}

impl Region {
    /// Fixed enumeration order. Aggregation, similarity probing and
    /// export all walk regions in this order, which keeps first-hit
    /// tie-breaks reproducible.
    pub const ALL: [Region; 7] = [
        Region::Vic,
        Region::Nsw,
        Region::Qld,
        Region::Wa,
        Region::Sa,
        Region::Tas,
        Region::Nt,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Region::Vic => "VIC",
            Region::Nsw => "NSW",
            Region::Qld => "QLD",
            Region::Wa => "WA",
            Region::Sa => "SA",
            Region::Tas => "TAS",
            Region::Nt => "NT",
        }
    }

    /// Name of the region's table of daily records.
    pub fn table(&self) -> &'static str {
        self.code()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown region code: {0}")]
pub struct ParseRegionError(String);

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VIC" => Ok(Region::Vic),
            "NSW" => Ok(Region::Nsw),
            "QLD" => Ok(Region::Qld),
            "WA" => Ok(Region::Wa),
            "SA" => Ok(Region::Sa),
            "TAS" => Ok(Region::Tas),
            "NT" => Ok(Region::Nt),
            other => Err(ParseRegionError(other.to_owned())),
        }
    }
}
