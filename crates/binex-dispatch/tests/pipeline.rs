//! Integration test: gateway-to-engine round trips through a spawned
//! dispatcher.

use binex_dispatch::spawn;
use binex_engine::MatchingEngine;
use binex_types::{Command, DispatchConfig, Event, InboundCommand, Side, Symbol};
use chrono::{Duration, Utc};

fn config() -> DispatchConfig {
    DispatchConfig {
        queue_capacity: 64,
        response_timeout_ms: 2_000,
        broadcast_capacity: 64,
    }
}

fn buy(user: &str, side: Side, price: i64, quantity: u64) -> Command {
    Command::BuyStock {
        user_id: user.into(),
        stock_symbol: "M".into(),
        stock_type: side,
        quantity,
        price,
    }
}

#[tokio::test]
async fn full_session_over_the_queue() {
    let (client, handle) = spawn(MatchingEngine::default(), &config());
    let mut events = client.subscribe();
    let now = Utc::now();

    for user in ["alice", "bob"] {
        let created = client
            .submit(Command::CreateUser {
                user_id: user.into(),
            })
            .await
            .unwrap();
        assert_eq!(created.status_code, 201);
        let funded = client
            .submit(Command::Onramp {
                user_id: user.into(),
                amount: 10_000,
            })
            .await
            .unwrap();
        assert_eq!(funded.data["balance"], 10_000);
    }
    let market = client
        .submit(Command::CreateMarket {
            stock_symbol: "M".into(),
            title: "Monsoon arrives by June".into(),
            description: String::new(),
            start_time: now - Duration::minutes(1),
            end_time: now + Duration::hours(1),
            source_of_truth: Some("IMD".into()),
        })
        .await
        .unwrap();
    assert_eq!(market.status_code, 201);

    let minted = client.submit(buy("alice", Side::Yes, 400, 5)).await.unwrap();
    assert_eq!(minted.data["restingQuantity"], 5);
    let Event::OrderBook(delta) = events.recv().await.unwrap() else {
        panic!("expected an order-book delta");
    };
    assert_eq!(delta.symbol, Symbol::from("M"));
    assert_eq!(delta.order_book.no.get(&600).map(|l| l.total), Some(5));

    let paired = client.submit(buy("bob", Side::No, 600, 2)).await.unwrap();
    assert_eq!(paired.data["filledQuantity"], 2);
    let Event::OrderBook(delta) = events.recv().await.unwrap() else {
        panic!("expected an order-book delta");
    };
    assert_eq!(delta.order_book.no.get(&600).map(|l| l.total), Some(3));

    let stock = client
        .submit(Command::GetStockBalance {
            user_id: "alice".into(),
        })
        .await
        .unwrap();
    assert_eq!(stock.data["M"]["yes"]["quantity"], 2);

    let state = client.capture().await.unwrap();
    assert_eq!(state.orders_list.len(), 2);

    client.shutdown().await.unwrap();
    let engine = handle.await.unwrap();
    engine.audit().unwrap();
}

#[tokio::test]
async fn raw_envelopes_are_answered() {
    let engine = MatchingEngine::dummy_with_users("M", &[("alice", 1_000)]);
    let (client, _handle) = spawn(engine, &config());

    let ok = client
        .submit_raw(
            "c-1",
            r#"{"command":"GET_INR_BALANCE","payload":{"userId":"alice"},"correlationId":"c-1"}"#
                .into(),
        )
        .await
        .unwrap();
    assert_eq!(ok.data["balance"], 1_000);

    let bad = client
        .submit_raw(
            "c-2",
            r#"{"command":"BUY_STOCK","payload":{"userId":"alice"},"correlationId":"c-2"}"#.into(),
        )
        .await
        .unwrap();
    assert_eq!(bad.status_code, 400);
    assert_eq!(client.pending(), 0);
}

#[tokio::test]
async fn commands_apply_in_queue_order() {
    let engine = MatchingEngine::dummy_with_users("M", &[("alice", 100_000)]);
    let (client, handle) = spawn(engine, &config());

    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .submit_inbound(InboundCommand::new(buy("alice", Side::Yes, 100, 1), format!("c-{i}")))
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_success());
    }
    client.shutdown().await.unwrap();
    let engine = handle.await.unwrap();
    assert_eq!(engine.ledger().orders.len(), 20);
    assert_eq!(engine.inr_balance(&"alice".into()).unwrap().locked, 2_000);
}
