//! The dispatcher loop: decode, execute, publish.
//!
//! Each command maps onto exactly one engine call. A successful trade
//! (`BUY_STOCK`, `SELL_STOCK`, `EXIT`, `CANCEL`) also emits an order-book
//! delta for its market; `SETTLE_MARKET` emits an emptied delta followed by
//! a settlement notice.

use std::collections::BTreeMap;

use binex_engine::{MatchingEngine, NewMarket, OrderRequest};
use binex_types::{
    BinexError, BookDepth, Command, CommandResponse, Event, InboundCommand, OrderBookDelta,
    OrderId, Price, Result, SettlementEvent, Side, Symbol, UserId,
};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::envelope::Envelope;
use crate::publisher::Publisher;

/// Result of one command: the caller's response plus broadcast events.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub response: CommandResponse,
    pub events: Vec<Event>,
}

impl Outcome {
    fn reply(response: CommandResponse) -> Self {
        Self {
            response,
            events: Vec::new(),
        }
    }

    fn with_event(mut self, event: Option<Event>) -> Self {
        self.events.extend(event);
        self
    }
}

/// Sole owner of the matching engine while running.
pub struct Dispatcher<P: Publisher> {
    engine: MatchingEngine,
    publisher: P,
}

impl<P: Publisher> Dispatcher<P> {
    pub fn new(engine: MatchingEngine, publisher: P) -> Self {
        Self { engine, publisher }
    }

    #[must_use]
    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Drain `queue` until it closes or a `Shutdown` arrives. Returns the
    /// engine so the caller keeps the final state.
    pub async fn run(mut self, mut queue: mpsc::Receiver<Envelope>) -> MatchingEngine {
        tracing::info!("Dispatcher started");
        while let Some(envelope) = queue.recv().await {
            match envelope {
                Envelope::Command(inbound) => self.process(inbound, Utc::now()),
                Envelope::Raw(raw) => self.process_raw(&raw, Utc::now()),
                Envelope::Capture(reply) => {
                    if reply.send(self.engine.export_state()).is_err() {
                        tracing::debug!("Capture requester went away");
                    }
                }
                Envelope::Shutdown => {
                    tracing::info!("Dispatcher shutdown requested");
                    break;
                }
            }
        }
        tracing::info!("Dispatcher stopped");
        self.engine
    }

    /// Decode a raw envelope and process it. Undecodable input is answered
    /// with a 400 when its correlation id can be recovered.
    pub fn process_raw(&mut self, raw: &str, now: DateTime<Utc>) {
        match InboundCommand::from_json(raw) {
            Ok(inbound) => self.process(inbound, now),
            Err(failure) => {
                tracing::warn!(error = %failure.error, "Rejected undecodable command");
                if let Some(correlation_id) = failure.correlation_id {
                    self.publisher
                        .publish_result(&correlation_id, CommandResponse::from(&failure.error));
                }
            }
        }
    }

    /// Execute one command and publish its result and events.
    pub fn process(&mut self, inbound: InboundCommand, now: DateTime<Utc>) {
        let name = inbound.command.name();
        let outcome = match self.execute(&inbound.command, now) {
            Ok(outcome) => {
                tracing::info!(
                    command = name,
                    correlation_id = %inbound.correlation_id,
                    status = outcome.response.status_code,
                    "Command processed"
                );
                outcome
            }
            Err(err) => {
                if err.status_code() >= 500 {
                    tracing::error!(command = name, correlation_id = %inbound.correlation_id, error = %err, "Command failed");
                } else {
                    tracing::warn!(command = name, correlation_id = %inbound.correlation_id, error = %err, "Command rejected");
                }
                Outcome::reply(CommandResponse::from(&err))
            }
        };
        self.publisher
            .publish_result(&inbound.correlation_id, outcome.response);
        for event in outcome.events {
            self.publisher.publish_event(event);
        }
    }

    /// Map a command onto the engine.
    pub fn execute(&mut self, command: &Command, now: DateTime<Utc>) -> Result<Outcome> {
        match command {
            Command::CreateUser { user_id } => {
                let balance = self.engine.create_user(user_id)?;
                Ok(Outcome::reply(CommandResponse::created(
                    format!("User {user_id} created"),
                    serde_json::to_value(balance)?,
                )))
            }
            Command::Onramp { user_id, amount } => {
                let balance = self.engine.onramp(user_id, *amount)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    format!("Onramped {amount} to {user_id}"),
                    serde_json::to_value(balance)?,
                )))
            }
            Command::CreateMarket {
                stock_symbol,
                title,
                description,
                start_time,
                end_time,
                source_of_truth,
            } => {
                let market = self.engine.create_market(NewMarket {
                    symbol: stock_symbol.clone(),
                    title: title.clone(),
                    description: description.clone(),
                    start_time: *start_time,
                    end_time: *end_time,
                    source_of_truth: source_of_truth.clone(),
                })?;
                Ok(Outcome::reply(CommandResponse::created(
                    format!("Market {stock_symbol} created"),
                    serde_json::to_value(market)?,
                )))
            }
            Command::SettleMarket {
                stock_symbol,
                result,
            } => {
                let report = self.engine.settle(stock_symbol, *result, now)?;
                // The book is gone: publish it emptied before the notice.
                let cleared = Event::OrderBook(OrderBookDelta {
                    symbol: stock_symbol.clone(),
                    order_book: BookDepth::default(),
                });
                Ok(Outcome::reply(CommandResponse::ok(
                    format!("Market {stock_symbol} settled {result}"),
                    serde_json::to_value(report)?,
                ))
                .with_event(Some(cleared))
                .with_event(Some(Event::Settlement(SettlementEvent {
                    symbol: stock_symbol.clone(),
                    result: *result,
                }))))
            }
            Command::BuyStock {
                user_id,
                stock_symbol,
                stock_type,
                quantity,
                price,
            } => {
                let request = order_request(user_id, stock_symbol, *stock_type, *quantity, *price)?;
                let report = self.engine.place_buy(&request, now)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Buy order placed",
                    serde_json::to_value(report)?,
                ))
                .with_event(self.delta(stock_symbol)))
            }
            Command::SellStock {
                user_id,
                stock_symbol,
                stock_type,
                quantity,
                price,
            } => {
                let request = order_request(user_id, stock_symbol, *stock_type, *quantity, *price)?;
                let report = self.engine.place_sell(&request, now)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Sell order placed",
                    serde_json::to_value(report)?,
                ))
                .with_event(self.delta(stock_symbol)))
            }
            Command::Exit {
                user_id,
                stock_symbol,
                stock_type,
                quantity,
                price,
            } => {
                let reference = price.map(Price::from_paise).transpose()?;
                let report =
                    self.engine
                        .exit(user_id, stock_symbol, *stock_type, *quantity, reference, now)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Exit order placed",
                    serde_json::to_value(report)?,
                ))
                .with_event(self.delta(stock_symbol)))
            }
            Command::Cancel { user_id, order_id } => {
                let order_id = OrderId::parse(order_id).ok_or_else(|| BinexError::InvalidCommand {
                    reason: format!("malformed order id {order_id}"),
                })?;
                let record = self.engine.cancel(user_id, &order_id)?;
                let symbol = record.symbol.clone();
                Ok(Outcome::reply(CommandResponse::ok(
                    format!("Order {order_id} cancelled"),
                    serde_json::to_value(record)?,
                ))
                .with_event(self.delta(&symbol)))
            }
            Command::GetPrice { stock_symbol } => {
                let quote = self.engine.quote(stock_symbol)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Success",
                    serde_json::to_value(quote)?,
                )))
            }
            Command::GetOrders { user_id } => {
                let orders = self.engine.orders_for_user(user_id)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Success",
                    serde_json::to_value(orders)?,
                )))
            }
            Command::GetOrderBook { stock_symbol } => {
                let books = match stock_symbol {
                    Some(symbol) => {
                        BTreeMap::from([(symbol.clone(), self.engine.order_book(symbol)?)])
                    }
                    None => self.engine.order_books(),
                };
                Ok(Outcome::reply(CommandResponse::ok(
                    "Success",
                    serde_json::to_value(books)?,
                )))
            }
            Command::GetInrBalance { user_id } => {
                let balance = self.engine.inr_balance(user_id)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Success",
                    serde_json::to_value(balance)?,
                )))
            }
            Command::GetStockBalance { user_id } => {
                let positions = self.engine.stock_balances(user_id)?;
                Ok(Outcome::reply(CommandResponse::ok(
                    "Success",
                    serde_json::to_value(positions)?,
                )))
            }
        }
    }

    fn delta(&self, symbol: &Symbol) -> Option<Event> {
        self.engine.depth(symbol).map(|order_book| {
            Event::OrderBook(OrderBookDelta {
                symbol: symbol.clone(),
                order_book,
            })
        })
    }
}

fn order_request(
    user_id: &UserId,
    symbol: &Symbol,
    side: Side,
    quantity: u64,
    price: i64,
) -> Result<OrderRequest> {
    Ok(OrderRequest {
        user_id: user_id.clone(),
        symbol: symbol.clone(),
        side,
        price: Price::from_paise(price)?,
        quantity,
    })
}
