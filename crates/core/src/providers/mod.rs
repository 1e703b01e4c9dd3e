pub mod traits;

// Quote source implementations
pub mod http_quotes;
pub mod yahoo_finance;
