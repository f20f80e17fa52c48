use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::round2;
use crate::{MarketSnapshot, UtcDateTime};

/// Display row of the live market table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub id: String,
    pub rank: Option<i64>,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: String,
    pub volume_24h: String,
    pub market_cap: String,
    pub fully_diluted_valuation: String,
    pub circulating_supply: String,
    pub total_supply: String,
    pub max_supply: String,
    pub percentage_in_circulation: Option<f64>,
    pub change_1h: Option<String>,
    pub change_24h: Option<String>,
    pub change_7d: Option<String>,
    pub change_30d: Option<String>,
    pub change_1y: Option<String>,
}

impl MarketRow {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let percentage_in_circulation = match (snapshot.circulating_supply, snapshot.max_supply) {
            (Some(circulating), Some(max)) if max > 0.0 => Some(round2(circulating / max * 100.0)),
            _ => None,
        };

        Self {
            id: snapshot.id.clone(),
            rank: snapshot.market_cap_rank,
            symbol: snapshot
                .symbol
                .as_deref()
                .unwrap_or_default()
                .to_uppercase(),
            name: snapshot.name.clone().unwrap_or_default(),
            image: snapshot.image.clone(),
            current_price: snapshot
                .current_price
                .map(format_price)
                .unwrap_or_else(|| String::from("None")),
            volume_24h: abbreviate(snapshot.total_volume),
            market_cap: abbreviate(snapshot.market_cap),
            fully_diluted_valuation: abbreviate(snapshot.fully_diluted_valuation),
            circulating_supply: abbreviate(snapshot.circulating_supply),
            total_supply: abbreviate(snapshot.total_supply),
            max_supply: abbreviate(snapshot.max_supply),
            percentage_in_circulation,
            change_1h: snapshot.price_change_percentage_1h_in_currency.map(format_percent),
            change_24h: snapshot.price_change_percentage_24h_in_currency.map(format_percent),
            change_7d: snapshot.price_change_percentage_7d_in_currency.map(format_percent),
            change_30d: snapshot.price_change_percentage_30d_in_currency.map(format_percent),
            change_1y: snapshot.price_change_percentage_1y_in_currency.map(format_percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTable {
    /// Newest `last_updated` across rows, as `YYYY/MM/DD - HH:MM:SS UTC`.
    pub last_updated: Option<String>,
    pub rows: Vec<MarketRow>,
}

/// Rows sorted by market cap rank; unranked assets go last.
pub fn market_table(snapshots: &[MarketSnapshot]) -> MarketTable {
    let last_updated = snapshots
        .iter()
        .filter_map(|snapshot| snapshot.last_updated.as_deref())
        .filter_map(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
        .filter_map(|parsed| UtcDateTime::from_offset_datetime(parsed).ok())
        .max()
        .map(UtcDateTime::format_display);

    let mut rows = snapshots.iter().map(MarketRow::from_snapshot).collect::<Vec<_>>();
    rows.sort_by_key(|row| (row.rank.is_none(), row.rank));

    MarketTable { last_updated, rows }
}

/// Up to twelve decimals, trailing zeros trimmed, thousands separated.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{price:.12}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    let (integer, fraction) = match trimmed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (trimmed, None),
    };

    let grouped = group_thousands(integer);
    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}

/// `1.23T`, `4.5B`, `6.78M`, `9.1K`; `None` when missing or zero.
pub fn abbreviate(value: Option<f64>) -> String {
    let Some(value) = value.filter(|value| *value != 0.0 && value.is_finite()) else {
        return String::from("None");
    };

    const SCALES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in SCALES {
        if value >= scale {
            return format!("{}{suffix}", float_text(round2(value / scale)));
        }
    }
    float_text(value)
}

/// Two decimals with thousands separators.
pub fn format_percent(value: f64) -> String {
    let fixed = format!("{value:.2}");
    match fixed.split_once('.') {
        Some((integer, fraction)) => format!("{}.{fraction}", group_thousands(integer)),
        None => fixed,
    }
}

/// Shortest float text that always carries a decimal point.
fn float_text(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn group_thousands(integer: &str) -> String {
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", integer),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_keep_significant_decimals_only() {
        assert_eq!(format_price(64_123.5), "64,123.5");
        assert_eq!(format_price(1_000.0), "1,000");
        assert_eq!(format_price(0.000_012_34), "0.00001234");
    }

    #[test]
    fn large_figures_are_abbreviated() {
        assert_eq!(abbreviate(Some(1_260_000_000_000.0)), "1.26T");
        assert_eq!(abbreviate(Some(21_000_000.0)), "21.0M");
        assert_eq!(abbreviate(Some(4_567.0)), "4.57K");
        assert_eq!(abbreviate(Some(999.0)), "999.0");
        assert_eq!(abbreviate(Some(0.0)), "None");
        assert_eq!(abbreviate(None), "None");
    }

    #[test]
    fn percentages_have_two_decimals() {
        assert_eq!(format_percent(-1.234), "-1.23");
        assert_eq!(format_percent(12_345.6), "12,345.60");
    }

    #[test]
    fn table_sorts_by_rank_and_formats_latest_update() {
        let snapshots = vec![
            MarketSnapshot {
                id: String::from("ethereum"),
                symbol: Some(String::from("eth")),
                market_cap_rank: Some(2),
                last_updated: Some(String::from("2024-03-01T10:00:05.120Z")),
                ..MarketSnapshot::default()
            },
            MarketSnapshot {
                id: String::from("mystery"),
                ..MarketSnapshot::default()
            },
            MarketSnapshot {
                id: String::from("bitcoin"),
                symbol: Some(String::from("btc")),
                market_cap_rank: Some(1),
                circulating_supply: Some(19_600_000.0),
                max_supply: Some(21_000_000.0),
                last_updated: Some(String::from("2024-03-01T09:59:00.000Z")),
                ..MarketSnapshot::default()
            },
        ];

        let table = market_table(&snapshots);

        let ids = table.rows.iter().map(|row| row.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "mystery"]);
        assert_eq!(table.rows[0].symbol, "BTC");
        assert_eq!(table.rows[0].percentage_in_circulation, Some(93.33));
        assert_eq!(table.last_updated.as_deref(), Some("2024/03/01 - 10:00:05 UTC"));
    }
}
