//! Stock exchange fixtures shared by the integration tests.

use anyhow::anyhow;
use mediator_core::binding::{Binding, HandlerDescriptor};
use mediator_core::callback::Reply;
use mediator_core::error::DispatchError;
use mediator_core::handler::Handler;
use mediator_core::policy::handles;
use mediator_core::types::TypeKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

#[derive(Debug, Clone, PartialEq)]
pub struct GetStockQuote {
    pub symbol: String,
}

impl GetStockQuote {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockQuote {
    pub symbol: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellStock {
    pub symbol: String,
    pub shares: u32,
}

#[derive(Debug, Default)]
pub struct StockQuoteHandler {
    pub quotes_served: AtomicUsize,
}

impl Handler for StockQuoteHandler {}

impl StockQuoteHandler {
    pub fn served(&self) -> usize {
        self.quotes_served.load(Ordering::SeqCst)
    }
}

static REGISTER_STOCK_HANDLERS: Once = Once::new();

/// Declare the bindings of [`StockQuoteHandler`] once per test binary
pub fn register_stock_handlers() {
    REGISTER_STOCK_HANDLERS.call_once(|| {
        let descriptor = HandlerDescriptor::for_type::<StockQuoteHandler>();

        let get_quote = Binding::builder(TypeKey::of::<GetStockQuote>())
            .key("get_quote")
            .method::<StockQuoteHandler, _>(|handler, arguments, _context| {
                handler.quotes_served.fetch_add(1, Ordering::SeqCst);
                let symbol = arguments.require::<GetStockQuote>(0)?.symbol.clone();
                Ok(Reply::pending(async move {
                    tokio::task::yield_now().await;
                    Ok(Reply::value(StockQuote {
                        symbol,
                        value: 34.0,
                    }))
                }))
            })
            .build()
            .expect("get_quote binding");
        descriptor
            .add_binding(handles(), get_quote)
            .expect("register get_quote");

        let sell = Binding::builder(TypeKey::of::<SellStock>())
            .key("sell")
            .function(|_arguments, _context| {
                Err(DispatchError::handler(anyhow!("Stock Exchange is down")))
            })
            .build()
            .expect("sell binding");
        descriptor
            .add_binding(handles(), sell)
            .expect("register sell");
    });
}
