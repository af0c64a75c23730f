//! Common-material alert: how recently each parent item of a part was requested

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::columns::MissingColumns;
use crate::core::dates::parse_date;
use crate::core::ledger::{cell, Ledger};

/// Recency bucket for an item's last request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recency {
    #[serde(rename = "1주 이내")]
    WithinOneWeek,
    #[serde(rename = "2주 이내")]
    WithinTwoWeeks,
}

impl Recency {
    pub fn classify(days: i64) -> Option<Self> {
        match days {
            d if d <= 7 => Some(Recency::WithinOneWeek),
            d if d <= 14 => Some(Recency::WithinTwoWeeks),
            _ => None,
        }
    }
}

impl std::fmt::Display for Recency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recency::WithinOneWeek => write!(f, "1주 이내"),
            Recency::WithinTwoWeeks => write!(f, "2주 이내"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonUsage {
    pub item: String,
    pub name: String,
    pub last_request: Option<NaiveDate>,
    pub days_since: Option<i64>,
    pub recency: Option<Recency>,
}

/// Parent items that use `part`, newest last request first
pub fn common_usage(
    ledger: &Ledger,
    part: &str,
    today: NaiveDate,
) -> Result<Vec<CommonUsage>, MissingColumns> {
    let bom = &ledger.bom;
    let (Some(item_col), Some(name_col), Some(part_col)) = (
        bom.col("A", &["품목코드"]),
        bom.col("B", &["품명"]),
        bom.col("C", &["품번"]),
    ) else {
        return Err(MissingColumns::new(&bom.name, "품목코드(A), 품명(B), 품번(C)"));
    };

    let mut items: Vec<(String, String)> = Vec::new();
    for row in &bom.rows {
        if cell(row, part_col) != part {
            continue;
        }
        let pair = (cell(row, item_col).to_string(), cell(row, name_col).to_string());
        if !pair.0.is_empty() && !items.contains(&pair) {
            items.push(pair);
        }
    }

    let receipts = &ledger.receipts;
    let finished_col = receipts.col("D", &["완성품번", "품목코드", "품번"]);
    let date_col = receipts.col("K", &["요청날짜", "요청일"]);

    let mut out: Vec<CommonUsage> = items
        .into_iter()
        .map(|(item, name)| {
            let last_request = match (finished_col, date_col) {
                (Some(fc), Some(dc)) => receipts
                    .rows
                    .iter()
                    .filter(|r| cell(r, fc) == item)
                    .filter_map(|r| parse_date(cell(r, dc)))
                    .max(),
                _ => None,
            };
            let days_since = last_request.map(|d| (today - d).num_days());
            CommonUsage {
                item,
                name,
                last_request,
                days_since,
                recency: days_since.and_then(Recency::classify),
            }
        })
        .collect();

    // Newest first; undated items sink to the bottom
    out.sort_by(|a, b| match (a.last_request, b.last_request) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Ok(out)
}
