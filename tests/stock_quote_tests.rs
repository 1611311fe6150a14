//! Request/response flow against the stock exchange fixtures.

mod common;

use common::*;
use mediator_core::callback::Command;
use mediator_core::handler::{HandlerExt, HandlerRef};
use std::sync::Arc;

fn exchange() -> (Arc<StockQuoteHandler>, HandlerRef) {
    register_stock_handlers();
    let quotes = Arc::new(StockQuoteHandler::default());
    let root = compose(vec![quotes.clone() as HandlerRef]);
    (quotes, root)
}

#[tokio::test]
async fn test_stock_quote_is_served_asynchronously() {
    let (quotes, root) = exchange();

    let result = root.send(GetStockQuote::new("ABC")).unwrap();
    assert!(result.is_pending());
    assert_eq!(quotes.served(), 1);

    let quote = values(result).await;
    assert_eq!(
        downcast_all::<StockQuote>(&quote),
        vec![StockQuote {
            symbol: "ABC".to_string(),
            value: 34.0,
        }]
    );
}

#[tokio::test]
async fn test_many_quotes_are_independent() {
    let (quotes, root) = exchange();

    let abc = root.send(GetStockQuote::new("ABC")).unwrap();
    let xyz = root.send(GetStockQuote::new("XYZ")).unwrap();
    let (abc, xyz) = futures::join!(values(abc), values(xyz));

    assert_eq!(downcast_all::<StockQuote>(&abc)[0].symbol, "ABC");
    assert_eq!(downcast_all::<StockQuote>(&xyz)[0].symbol, "XYZ");
    assert_eq!(quotes.served(), 2);
}

#[test]
fn test_handler_failure_propagates() {
    let (_quotes, root) = exchange();

    let error = root
        .send(SellStock {
            symbol: "ABC".to_string(),
            shares: 2,
        })
        .unwrap_err();
    assert!(!error.is_not_handled());
    assert!(error.to_string().contains("Stock Exchange is down"));
}

#[test]
fn test_unhandled_request_is_reported_with_the_request() {
    #[derive(Debug, Clone, PartialEq)]
    struct BuyStock {
        symbol: String,
    }

    let (_quotes, root) = exchange();
    let error = root
        .send_command(Command::of(BuyStock {
            symbol: "ABC".to_string(),
        }))
        .unwrap_err();

    assert!(error.is_not_handled());
    let request = error.request().and_then(|request| request.downcast_ref::<BuyStock>());
    assert_eq!(request.map(|buy| buy.symbol.as_str()), Some("ABC"));
}
