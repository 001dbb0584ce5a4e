use crate::{
    blocking,
    response::{unwrap_field, Json},
    FcOnlineTrade, FcOnlineUserBasic, FcOnlineUserMaxDivision, NexonClient, Query, QueryValue,
    RequestOptions, Result, TradeType,
};

use super::endpoint_options;

const OUID_PATH: &str = "fconline/v1/id";
const USER_BASIC_PATH: &str = "fconline/v1/user/basic";
const USER_MAX_DIVISION_PATH: &str = "fconline/v1/user/maxdivision";
const USER_MATCH_PATH: &str = "fconline/v1/user/match";
const USER_TRADE_PATH: &str = "fconline/v1/user/trade";

fn ouid_options(nickname: &str, options: &RequestOptions) -> RequestOptions {
    let mut options = endpoint_options(Query::new().with("nickname", nickname), options);
    if options.post_parser.is_none() {
        options = options.with_post_parser(unwrap_field("ouid"));
    }
    options
}

fn ouid_query(ouid: &str) -> Query {
    Query::new().with("ouid", ouid)
}

fn page_query(ouid: &str, kind: &str, value: QueryValue, offset: Option<u32>, limit: Option<u32>) -> Query {
    ouid_query(ouid)
        .with(kind, value)
        .with("offset", offset)
        .with("limit", limit)
}

/// FC Online endpoints on the async client.
#[derive(Clone, Copy, Debug)]
pub struct FcOnline<'a> {
    client: &'a NexonClient,
}

impl<'a> FcOnline<'a> {
    pub(crate) fn new(client: &'a NexonClient) -> Self {
        Self { client }
    }

    /// Looks up the account identifier for a nickname.
    pub async fn get_ouid(&self, nickname: &str, options: &RequestOptions) -> Result<String> {
        self.client
            .get::<Json<String>>(OUID_PATH, &ouid_options(nickname, options))
            .await
    }

    /// Nickname, level and account identifier.
    pub async fn get_user_basic(&self, ouid: &str, options: &RequestOptions) -> Result<FcOnlineUserBasic> {
        self.client
            .get::<Json<FcOnlineUserBasic>>(USER_BASIC_PATH, &endpoint_options(ouid_query(ouid), options))
            .await
    }

    /// Highest division reached per match type.
    pub async fn get_user_max_division(
        &self,
        ouid: &str,
        options: &RequestOptions,
    ) -> Result<Vec<FcOnlineUserMaxDivision>> {
        self.client
            .get::<Json<Vec<FcOnlineUserMaxDivision>>>(
                USER_MAX_DIVISION_PATH,
                &endpoint_options(ouid_query(ouid), options),
            )
            .await
    }

    /// Match identifiers, newest first. `limit` is capped at 100 by the API.
    pub async fn get_user_match_history(
        &self,
        ouid: &str,
        matchtype: i64,
        offset: Option<u32>,
        limit: Option<u32>,
        options: &RequestOptions,
    ) -> Result<Vec<String>> {
        let query = page_query(ouid, "matchtype", QueryValue::integer(matchtype), offset, limit);
        self.client
            .get::<Json<Vec<String>>>(USER_MATCH_PATH, &endpoint_options(query, options))
            .await
    }

    /// The account's own transfer market trades, newest first.
    pub async fn get_user_trade_history(
        &self,
        ouid: &str,
        tradetype: TradeType,
        offset: Option<u32>,
        limit: Option<u32>,
        options: &RequestOptions,
    ) -> Result<Vec<FcOnlineTrade>> {
        let query = page_query(ouid, "tradetype", QueryValue::text(tradetype.as_str()), offset, limit);
        self.client
            .get::<Json<Vec<FcOnlineTrade>>>(USER_TRADE_PATH, &endpoint_options(query, options))
            .await
    }
}

/// FC Online endpoints on the blocking client.
#[derive(Clone, Copy, Debug)]
pub struct FcOnlineBlocking<'a> {
    client: &'a blocking::NexonClient,
}

impl<'a> FcOnlineBlocking<'a> {
    pub(crate) fn new(client: &'a blocking::NexonClient) -> Self {
        Self { client }
    }

    /// Looks up the account identifier for a nickname.
    pub fn get_ouid(&self, nickname: &str, options: &RequestOptions) -> Result<String> {
        self.client
            .get::<Json<String>>(OUID_PATH, &ouid_options(nickname, options))
    }

    /// Nickname, level and account identifier.
    pub fn get_user_basic(&self, ouid: &str, options: &RequestOptions) -> Result<FcOnlineUserBasic> {
        self.client
            .get::<Json<FcOnlineUserBasic>>(USER_BASIC_PATH, &endpoint_options(ouid_query(ouid), options))
    }

    /// Highest division reached per match type.
    pub fn get_user_max_division(
        &self,
        ouid: &str,
        options: &RequestOptions,
    ) -> Result<Vec<FcOnlineUserMaxDivision>> {
        self.client.get::<Json<Vec<FcOnlineUserMaxDivision>>>(
            USER_MAX_DIVISION_PATH,
            &endpoint_options(ouid_query(ouid), options),
        )
    }

    /// Match identifiers, newest first.
    pub fn get_user_match_history(
        &self,
        ouid: &str,
        matchtype: i64,
        offset: Option<u32>,
        limit: Option<u32>,
        options: &RequestOptions,
    ) -> Result<Vec<String>> {
        let query = page_query(ouid, "matchtype", QueryValue::integer(matchtype), offset, limit);
        self.client
            .get::<Json<Vec<String>>>(USER_MATCH_PATH, &endpoint_options(query, options))
    }

    /// The account's own transfer market trades, newest first.
    pub fn get_user_trade_history(
        &self,
        ouid: &str,
        tradetype: TradeType,
        offset: Option<u32>,
        limit: Option<u32>,
        options: &RequestOptions,
    ) -> Result<Vec<FcOnlineTrade>> {
        let query = page_query(ouid, "tradetype", QueryValue::text(tradetype.as_str()), offset, limit);
        self.client
            .get::<Json<Vec<FcOnlineTrade>>>(USER_TRADE_PATH, &endpoint_options(query, options))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ouid_options, page_query};
    use crate::{Omittable, QueryValue, RequestOptions};

    #[test]
    fn ouid_options_unwrap_the_ouid_field() {
        let options = ouid_options("Foo", &RequestOptions::new());
        let parser = options.post_parser.expect("post parser installed");
        assert_eq!(parser(json!({"ouid": "abc"})), json!("abc"));
        assert_eq!(
            options.query.get("nickname"),
            Some(&Omittable::Value(QueryValue::text("Foo")))
        );
    }

    #[test]
    fn unset_paging_is_null_and_dropped_later() {
        let query = page_query("abc", "matchtype", QueryValue::integer(50), None, Some(10));
        assert_eq!(query.get("offset"), Some(&Omittable::Value(QueryValue::Null)));
        assert_eq!(query.get("limit"), Some(&Omittable::Value(QueryValue::integer(10))));
    }
}
