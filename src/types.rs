use serde::{Deserialize, Serialize};

/// FC Online account summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcOnlineUserBasic {
    /// Account identifier.
    pub ouid: String,
    pub nickname: String,
    pub level: i64,
}

/// Highest division reached in one match type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcOnlineUserMaxDivision {
    pub match_type: i64,
    pub division: i64,
    /// UTC, as sent by the API.
    pub achievement_date: String,
}

/// Buy or sell side of the transfer market history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// One transfer market trade. Newest trades come first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcOnlineTrade {
    /// Listing time for purchases, completion time for sales (UTC).
    pub trade_date: String,
    pub sale_sn: String,
    /// Player identifier.
    pub spid: i64,
    pub grade: i64,
    /// Player value in BP.
    pub value: i64,
}
