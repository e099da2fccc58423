//! Row shape of a fund collection table (see migrations/).

use crate::types::FundFields;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FundRow {
    pub code: String,
    pub category: String,
    pub price: f64,
    pub liquidity: f64,
    pub pvpa: f64,
    pub dy: f64,
}

impl FundRow {
    pub fn fields(&self) -> FundFields {
        FundFields {
            category: self.category.clone(),
            price: self.price,
            liquidity: self.liquidity,
            pvpa: self.pvpa,
            dy: self.dy,
        }
    }
}

#[cfg(test)]
impl From<FundRow> for crate::types::FundRecord {
    fn from(r: FundRow) -> Self {
        Self {
            code: r.code,
            category: r.category,
            price: r.price,
            liquidity: r.liquidity,
            pvpa: r.pvpa,
            dy: r.dy,
        }
    }
}
