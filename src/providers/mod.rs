pub mod moneydj;
pub mod util;
pub mod yahoo_finance;
