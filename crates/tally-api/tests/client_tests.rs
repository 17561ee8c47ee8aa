// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tally_api::Client;
use tally_app::{
    CustomerId, ItemId, ItemRef, LookupSource, PageSize, PageSource, QueryState, SaleSubmission,
};
use time::{Date, Month};
use tiny_http::{Header, Method, Response, Server};

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_backend_error_is_actionable() {
    let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))
        .expect("client should initialize");
    let error = client
        .list_items(&QueryState::default())
        .expect_err("listing should fail for unreachable endpoint");
    assert!(format!("{error:#}").contains("[api].base_url"));
}

#[test]
fn list_items_sends_paging_and_trimmed_term() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/items?page=2&limit=20&q=brake+pad");
        let body = r#"{"data":{"items":[
            {"_id":"i1","name":"Brake Pad","description":"Front","quantity":4,"price":650.0}
        ],"total":21,"page":2,"limit":20,"totalPages":2}}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let page = client.list_items(&QueryState::new("  brake pad ", 2, PageSize::Twenty))?;
    assert_eq!(page.total, 21);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.rows[0].unit_price_cents, 65_000);
    assert_eq!(page.rows[0].id, ItemId::new("i1"));

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn blank_term_is_omitted() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/customers?page=1&limit=10");
        request
            .respond(json_response(r#"{"customers":[],"total":0}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let page: tally_app::ResultPage<tally_app::Customer> =
        client.fetch_page(&QueryState::new("   ", 1, PageSize::Ten))?;
    assert!(page.rows.is_empty());
    assert_eq!(page.total_pages, 0);

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn lookup_uses_list_route_and_bearer_token() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/customers/list?q=ravi");
        let auth = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        let body = r#"[{"_id":"c1","name":"Ravi Iyer","address":"MG Road","mobileNumber":"9876543210"}]"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client =
        Client::new(&addr, Duration::from_secs(1))?.with_token(Some("secret".to_owned()));
    let candidates: Vec<tally_app::Customer> = client.candidates(" ravi ")?;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].mobile_number, "9876543210");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn create_sale_posts_wire_body_and_decodes_result() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/sales");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body");
        let sent: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(sent["itemId"], "i1");
        assert_eq!(sent["customerId"], "c7");
        assert_eq!(sent["isCash"], false);
        assert_eq!(sent["date"], "2026-05-20");

        let reply = r#"{"sale":{"_id":"s9","itemId":"i1","customerId":"c7",
            "quantity":2,"isCash":false,"date":"2026-05-20T00:00:00.000Z","totalAmount":1300}}"#;
        request
            .respond(json_response(reply, 201))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let sale = client.save_sale(
        None,
        &SaleSubmission {
            item_id: ItemId::new("i1"),
            quantity: 2,
            date: Date::from_calendar_date(2026, Month::May, 20)?,
            is_cash: false,
            customer_id: Some(CustomerId::new("c7")),
        },
    )?;
    assert_eq!(sale.item, ItemRef::Id(ItemId::new("i1")));
    assert_eq!(sale.total_amount_cents, Some(130_000));

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn rejected_delete_surfaces_server_message() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Delete);
        assert_eq!(request.url(), "/api/items/i1");
        request
            .respond(json_response(
                r#"{"message":"Item is referenced by sales"}"#,
                409,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .delete_item(&ItemId::new("i1"))
        .expect_err("delete should be rejected");
    assert_eq!(
        error.to_string(),
        "server error (409): Item is referenced by sales"
    );

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn ledger_reads_transactions() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/reports/customers/c1/ledger");
        let body = r#"{"customer":{"_id":"c1"},"transactions":[
            {"_id":"s1","itemId":{"_id":"i1","name":"Horn","price":450},"quantity":1,
             "isCash":false,"customerId":"c1","date":"2026-01-05"}
        ]}"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let ledger = client.customer_ledger(&CustomerId::new("c1"))?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].total_amount_cents, None);

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn email_sales_report_posts_with_bearer_token() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/reports/sales/email");
        let auth = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        request
            .respond(json_response(r#"{"message":"Report sent"}"#, 200))
            .expect("response should succeed");
    });

    let client =
        Client::new(&addr, Duration::from_secs(1))?.with_token(Some("secret".to_owned()));
    client.email_sales_report()?;

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn rejected_email_surfaces_server_message() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"message":"No email on file"}"#, 400))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .email_sales_report()
        .expect_err("email should be rejected");
    assert_eq!(error.to_string(), "server error (400): No email on file");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn login_stores_token() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/auth/login");
        request
            .respond(json_response(r#"{"token":"t-123","user":{"name":"A"}}"#, 200))
            .expect("response should succeed");
    });

    let mut client = Client::new(&addr, Duration::from_secs(1))?;
    assert!(!client.has_token());
    client.login("owner@shop.test", "hunter2")?;
    assert!(client.has_token());

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}
