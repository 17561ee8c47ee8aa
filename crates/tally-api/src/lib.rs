// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking client for the shop backend's REST API.

mod wire;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tally_app::{
    Customer, CustomerId, CustomerSubmission, Item, ItemId, ItemSubmission, LookupSource,
    PageSource, QueryState, ResultPage, Sale, SaleId, SaleSubmission,
};
use tracing::{debug, info, warn};
use url::Url;

use wire::{
    CustomerBody, ErrorBody, FromWire, ItemBody, LoginBody, SaleBody, decode_list, decode_page,
    decode_record,
};

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    token: Option<String>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                base_url.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            token: None,
            http,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Exchanges credentials for a bearer token and keeps it for later calls.
    pub fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let url = self.endpoint(&["auth", "login"])?;
        let response = self.send(self.http.post(url).json(&LoginBody { email, password }))?;
        let body: Value = response.json().context("decode login response")?;
        let token = body
            .get("token")
            .or_else(|| body.get("data").and_then(|data| data.get("token")))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("login response carried no token"))?;
        self.token = Some(token.to_owned());
        info!(email, "logged in");
        Ok(())
    }

    /// Cheapest authenticated round trip: one item.
    pub fn ping(&self) -> Result<()> {
        self.list_items(&QueryState::new("", 1, tally_app::PageSize::Ten))
            .map(|_| ())
    }

    pub fn list_items(&self, query: &QueryState) -> Result<ResultPage<Item>> {
        self.fetch_collection(&["items"], "items", query)
    }

    pub fn list_customers(&self, query: &QueryState) -> Result<ResultPage<Customer>> {
        self.fetch_collection(&["customers"], "customers", query)
    }

    pub fn list_sales(&self, query: &QueryState) -> Result<ResultPage<Sale>> {
        self.fetch_collection(&["sales"], "sales", query)
    }

    pub fn item_candidates(&self, term: &str) -> Result<Vec<Item>> {
        self.fetch_candidates(&["items", "list"], "items", term)
    }

    pub fn customer_candidates(&self, term: &str) -> Result<Vec<Customer>> {
        self.fetch_candidates(&["customers", "list"], "customers", term)
    }

    pub fn save_item(&self, id: Option<&ItemId>, submission: &ItemSubmission) -> Result<Item> {
        self.save(&["items"], id.map(ItemId::as_str), "item", &ItemBody::from(submission))
    }

    pub fn save_customer(
        &self,
        id: Option<&CustomerId>,
        submission: &CustomerSubmission,
    ) -> Result<Customer> {
        self.save(
            &["customers"],
            id.map(CustomerId::as_str),
            "customer",
            &CustomerBody::from(submission),
        )
    }

    pub fn save_sale(&self, id: Option<&SaleId>, submission: &SaleSubmission) -> Result<Sale> {
        self.save(&["sales"], id.map(SaleId::as_str), "sale", &SaleBody::from(submission))
    }

    pub fn delete_item(&self, id: &ItemId) -> Result<()> {
        self.delete(&["items", id.as_str()])
    }

    pub fn delete_customer(&self, id: &CustomerId) -> Result<()> {
        self.delete(&["customers", id.as_str()])
    }

    pub fn delete_sale(&self, id: &SaleId) -> Result<()> {
        self.delete(&["sales", id.as_str()])
    }

    pub fn sales_report(&self) -> Result<Vec<Sale>> {
        let value = self.get_json(self.endpoint(&["reports", "sales"])?)?;
        decode_list(value, "sales")
    }

    pub fn items_report(&self) -> Result<Vec<Item>> {
        let value = self.get_json(self.endpoint(&["reports", "items"])?)?;
        decode_list(value, "items")
    }

    pub fn customer_ledger(&self, id: &CustomerId) -> Result<Vec<Sale>> {
        let url = self.endpoint(&["reports", "customers", id.as_str(), "ledger"])?;
        decode_list(self.get_json(url)?, "transactions")
    }

    /// Asks the backend to mail the sales report to the signed-in user.
    pub fn email_sales_report(&self) -> Result<()> {
        let url = self.endpoint(&["reports", "sales", "email"])?;
        self.send(self.http.post(url))?;
        info!("sales report email requested");
        Ok(())
    }

    fn fetch_collection<T: FromWire>(
        &self,
        path: &[&str],
        key: &str,
        query: &QueryState,
    ) -> Result<ResultPage<T>> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page().to_string());
            pairs.append_pair("limit", &query.page_size().get().to_string());
            if let Some(term) = query.trimmed_term() {
                pairs.append_pair("q", term);
            }
        }
        debug!(%url, "fetch page");
        decode_page(self.get_json(url)?, key, query)
    }

    fn fetch_candidates<T: FromWire>(
        &self,
        path: &[&str],
        key: &str,
        term: &str,
    ) -> Result<Vec<T>> {
        let mut url = self.endpoint(path)?;
        let term = term.trim();
        if !term.is_empty() {
            url.query_pairs_mut().append_pair("q", term);
        }
        debug!(%url, "fetch candidates");
        decode_list(self.get_json(url)?, key)
    }

    fn save<T: FromWire, B: Serialize>(
        &self,
        collection: &[&str],
        id: Option<&str>,
        key: &str,
        body: &B,
    ) -> Result<T> {
        let request = match id {
            Some(id) => {
                let mut path = collection.to_vec();
                path.push(id);
                self.http.put(self.endpoint(&path)?)
            }
            None => self.http.post(self.endpoint(collection)?),
        };
        let response = self.send(request.json(body))?;
        let value: Value = response
            .json()
            .with_context(|| format!("decode saved {key}"))?;
        info!(key, update = id.is_some(), "record saved");
        T::from_wire(decode_record(value, key)?)
    }

    fn delete(&self, path: &[&str]) -> Result<()> {
        self.send(self.http.delete(self.endpoint(path)?))?;
        info!(path = %path.join("/"), "record deleted");
        Ok(())
    }

    fn get_json(&self, url: Url) -> Result<Value> {
        let response = self.send(self.http.get(url))?;
        response.json().context("decode response body")
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "request rejected");
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("api.base_url {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl PageSource<Item> for Client {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Item>> {
        self.list_items(query)
    }
}

impl PageSource<Customer> for Client {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Customer>> {
        self.list_customers(query)
    }
}

impl PageSource<Sale> for Client {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Sale>> {
        self.list_sales(query)
    }
}

impl LookupSource<Item> for Client {
    fn candidates(&self, term: &str) -> Result<Vec<Item>> {
        self.item_candidates(term)
    }
}

impl LookupSource<Customer> for Client {
    fn candidates(&self, term: &str) -> Result<Vec<Customer>> {
        self.customer_candidates(term)
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!(
            "request to {} timed out -- raise [api].timeout or check the server ({})",
            base_url,
            error
        );
    }
    anyhow!(
        "cannot reach {} -- check [api].base_url and that the server is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if status == StatusCode::UNAUTHORIZED {
        return anyhow!(
            "unauthorized ({}) -- set [api].token or TALLY_API_TOKEN and retry",
            status.as_u16()
        );
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.error)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::{Client, clean_error_response};
    use anyhow::Result;
    use reqwest::StatusCode;
    use std::time::Duration;
    use tally_app::ItemId;

    #[test]
    fn rejects_empty_and_non_http_base_urls() {
        assert!(Client::new("  ", Duration::from_secs(1)).is_err());
        assert!(Client::new("ftp://shop.local/api", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn endpoints_keep_base_path_and_encode_segments() -> Result<()> {
        let client = Client::new("http://localhost:5000/api/", Duration::from_secs(1))?;
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        let url = client.endpoint(&["items", ItemId::new("a b").as_str()])?;
        assert_eq!(url.as_str(), "http://localhost:5000/api/items/a%20b");
        Ok(())
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Insufficient stock"}"#,
        );
        assert_eq!(error.to_string(), "server error (400): Insufficient stock");

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(error.to_string(), "server error (502): <html>bad gateway</html>");

        let error = clean_error_response(StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("TALLY_API_TOKEN"));
    }

    #[test]
    fn blank_token_is_ignored() -> Result<()> {
        let client = Client::new("http://localhost:5000/api", Duration::from_secs(1))?
            .with_token(Some(" ".to_owned()));
        assert!(!client.has_token());
        Ok(())
    }
}
