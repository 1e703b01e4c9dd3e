// ═══════════════════════════════════════════════════════════════════
// Provider Tests — HTTP batch client, Yahoo Finance, trait objects
// ═══════════════════════════════════════════════════════════════════

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use portfolio_live_core::errors::CoreError;
use portfolio_live_core::models::quote::RawQuote;
use portfolio_live_core::models::settings::LiveSettings;
use portfolio_live_core::providers::http_quotes::HttpQuoteClient;
use portfolio_live_core::providers::traits::QuoteClient;
use portfolio_live_core::providers::yahoo_finance::YahooFinanceQuoteClient;

fn symbols(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════════════
// HttpQuoteClient — response parsing
// ═══════════════════════════════════════════════════════════════════

mod http_parse {
    use super::*;

    #[test]
    fn keys_quotes_by_symbol() {
        let body = r#"[
            {"symbol": "BBB", "cmp": 50.0, "peRatio": null, "earningsTimestamp": null},
            {"symbol": "AAA", "cmp": 120.0, "peRatio": 15.0, "earningsTimestamp": 1700000000}
        ]"#;
        let quotes = HttpQuoteClient::parse_response(&symbols(&["AAA", "BBB"]), body).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes["AAA"],
            RawQuote::new("AAA")
                .with_cmp(120.0)
                .with_pe_ratio(15.0)
                .with_earnings_timestamp(1_700_000_000)
        );
        assert_eq!(quotes["BBB"].cmp, Some(50.0));
    }

    #[test]
    fn missing_symbols_are_omitted_not_errors() {
        let body = r#"[{"symbol": "AAA", "cmp": 1.0}]"#;
        let quotes = HttpQuoteClient::parse_response(&symbols(&["AAA", "ZZZ"]), body).unwrap();
        assert_eq!(quotes.len(), 1);
        assert!(!quotes.contains_key("ZZZ"));
    }

    #[test]
    fn unrequested_symbols_are_dropped() {
        let body = r#"[{"symbol": "AAA", "cmp": 1.0}, {"symbol": "EVIL", "cmp": 2.0}]"#;
        let quotes = HttpQuoteClient::parse_response(&symbols(&["AAA"]), body).unwrap();
        assert_eq!(quotes.len(), 1);
        assert!(quotes.contains_key("AAA"));
    }

    #[test]
    fn duplicate_records_keep_last() {
        let body = r#"[{"symbol": "AAA", "cmp": 1.0}, {"symbol": "AAA", "cmp": 2.0}]"#;
        let quotes = HttpQuoteClient::parse_response(&symbols(&["AAA"]), body).unwrap();
        assert_eq!(quotes["AAA"].cmp, Some(2.0));
    }

    #[test]
    fn empty_array_is_ok() {
        let quotes = HttpQuoteClient::parse_response(&symbols(&["AAA"]), "[]").unwrap();
        assert!(quotes.is_empty());
    }

    #[test]
    fn malformed_payload_is_fetch_failed() {
        let err = HttpQuoteClient::parse_response(&symbols(&["AAA"]), "{\"oops\": true}")
            .unwrap_err();
        assert!(err.is_fetch_failure());
    }

    #[test]
    fn non_json_payload_is_fetch_failed() {
        let err = HttpQuoteClient::parse_response(&symbols(&["AAA"]), "<html>").unwrap_err();
        assert!(matches!(err, CoreError::FetchFailed { .. }));
    }
}

// ═══════════════════════════════════════════════════════════════════
// HttpQuoteClient — network behavior
// ═══════════════════════════════════════════════════════════════════

mod http_fetch {
    use super::*;

    #[test]
    fn name_and_endpoint() {
        let client = HttpQuoteClient::from_settings(&LiveSettings::default());
        assert_eq!(client.name(), "Quote API");
        assert_eq!(client.endpoint(), LiveSettings::default().quote_endpoint);
    }

    #[tokio::test]
    async fn empty_symbol_set_skips_request() {
        let client = HttpQuoteClient::new("http://127.0.0.1:1/quotes", Duration::from_secs(1));
        let quotes = client.fetch_quotes(&BTreeSet::new()).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_fetch_failed() {
        let client = HttpQuoteClient::new("http://127.0.0.1:1/quotes", Duration::from_secs(2));
        let err = client.fetch_quotes(&symbols(&["AAA"])).await.unwrap_err();
        assert!(err.is_fetch_failure());
    }
}

// ═══════════════════════════════════════════════════════════════════
// YahooFinanceQuoteClient
// ═══════════════════════════════════════════════════════════════════

mod yahoo_finance {
    use super::*;

    #[test]
    fn name() {
        let client = YahooFinanceQuoteClient::new().unwrap();
        assert_eq!(client.name(), "Yahoo Finance");
    }

    #[test]
    fn valid_close_becomes_quote() {
        let quote = YahooFinanceQuoteClient::quote_from_close("AAPL", 189.5).unwrap();
        assert_eq!(quote, RawQuote::new("AAPL").with_cmp(189.5));
    }

    #[test]
    fn unusable_close_is_omitted() {
        assert_eq!(YahooFinanceQuoteClient::quote_from_close("AAPL", f64::NAN), None);
        assert_eq!(YahooFinanceQuoteClient::quote_from_close("AAPL", f64::INFINITY), None);
        assert_eq!(YahooFinanceQuoteClient::quote_from_close("AAPL", -1.0), None);
    }

    #[test]
    fn zero_close_is_kept() {
        let quote = YahooFinanceQuoteClient::quote_from_close("AAPL", 0.0).unwrap();
        assert_eq!(quote.cmp, Some(0.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trait compliance
// ═══════════════════════════════════════════════════════════════════

mod trait_compliance {
    use super::*;

    #[test]
    fn clients_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<HttpQuoteClient>();
        assert_send_sync::<YahooFinanceQuoteClient>();
    }

    #[test]
    fn clients_as_trait_objects() {
        let clients: Vec<Arc<dyn QuoteClient>> = vec![
            Arc::new(HttpQuoteClient::from_settings(&LiveSettings::default())),
            Arc::new(YahooFinanceQuoteClient::new().unwrap()),
        ];
        let names: Vec<&str> = clients.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Quote API", "Yahoo Finance"]);
    }
}
