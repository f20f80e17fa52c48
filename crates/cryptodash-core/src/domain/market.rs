use cryptodash_warehouse::MarketRecord;
use serde::{Deserialize, Serialize};

/// One asset row of the aggregator market listing.
///
/// Field names follow the upstream JSON so pages deserialize directly. Any
/// metric may be `null`; extra upstream fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i64>,
    pub fully_diluted_valuation: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub last_updated: Option<String>,
    pub price_change_percentage_14d_in_currency: Option<f64>,
    pub price_change_percentage_1h_in_currency: Option<f64>,
    pub price_change_percentage_1y_in_currency: Option<f64>,
    pub price_change_percentage_200d_in_currency: Option<f64>,
    pub price_change_percentage_24h_in_currency: Option<f64>,
    pub price_change_percentage_30d_in_currency: Option<f64>,
    pub price_change_percentage_7d_in_currency: Option<f64>,
}

impl MarketSnapshot {
    pub fn into_record(self) -> MarketRecord {
        MarketRecord {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image,
            current_price: self.current_price,
            market_cap: self.market_cap,
            market_cap_rank: self.market_cap_rank,
            fully_diluted_valuation: self.fully_diluted_valuation,
            total_volume: self.total_volume,
            high_24h: self.high_24h,
            low_24h: self.low_24h,
            price_change_24h: self.price_change_24h,
            price_change_percentage_24h: self.price_change_percentage_24h,
            market_cap_change_24h: self.market_cap_change_24h,
            market_cap_change_percentage_24h: self.market_cap_change_percentage_24h,
            circulating_supply: self.circulating_supply,
            total_supply: self.total_supply,
            max_supply: self.max_supply,
            ath: self.ath,
            ath_change_percentage: self.ath_change_percentage,
            ath_date: self.ath_date,
            atl: self.atl,
            atl_change_percentage: self.atl_change_percentage,
            atl_date: self.atl_date,
            last_updated: self.last_updated,
            price_change_percentage_14d_in_currency: self.price_change_percentage_14d_in_currency,
            price_change_percentage_1h_in_currency: self.price_change_percentage_1h_in_currency,
            price_change_percentage_1y_in_currency: self.price_change_percentage_1y_in_currency,
            price_change_percentage_200d_in_currency: self.price_change_percentage_200d_in_currency,
            price_change_percentage_24h_in_currency: self.price_change_percentage_24h_in_currency,
            price_change_percentage_30d_in_currency: self.price_change_percentage_30d_in_currency,
            price_change_percentage_7d_in_currency: self.price_change_percentage_7d_in_currency,
        }
    }

    pub fn from_record(record: MarketRecord) -> Self {
        Self {
            id: record.id,
            symbol: record.symbol,
            name: record.name,
            image: record.image,
            current_price: record.current_price,
            market_cap: record.market_cap,
            market_cap_rank: record.market_cap_rank,
            fully_diluted_valuation: record.fully_diluted_valuation,
            total_volume: record.total_volume,
            high_24h: record.high_24h,
            low_24h: record.low_24h,
            price_change_24h: record.price_change_24h,
            price_change_percentage_24h: record.price_change_percentage_24h,
            market_cap_change_24h: record.market_cap_change_24h,
            market_cap_change_percentage_24h: record.market_cap_change_percentage_24h,
            circulating_supply: record.circulating_supply,
            total_supply: record.total_supply,
            max_supply: record.max_supply,
            ath: record.ath,
            ath_change_percentage: record.ath_change_percentage,
            ath_date: record.ath_date,
            atl: record.atl,
            atl_change_percentage: record.atl_change_percentage,
            atl_date: record.atl_date,
            last_updated: record.last_updated,
            price_change_percentage_14d_in_currency: record.price_change_percentage_14d_in_currency,
            price_change_percentage_1h_in_currency: record.price_change_percentage_1h_in_currency,
            price_change_percentage_1y_in_currency: record.price_change_percentage_1y_in_currency,
            price_change_percentage_200d_in_currency: record.price_change_percentage_200d_in_currency,
            price_change_percentage_24h_in_currency: record.price_change_percentage_24h_in_currency,
            price_change_percentage_30d_in_currency: record.price_change_percentage_30d_in_currency,
            price_change_percentage_7d_in_currency: record.price_change_percentage_7d_in_currency,
        }
    }
}
