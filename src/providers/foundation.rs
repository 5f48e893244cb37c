//! Foundation subgraph lookup.
//!
//! The subgraph has no social profile data. It does expose the account's
//! creator revenue, minted NFTs and withdrawals, which become a
//! [`FoundationSales`] fragment.

use crate::aggregation::Lookup;
use crate::error::{FetchError, LookupFailure, StageExt};
use crate::http::HttpClient;
use crate::models::{
    Address, CreatorSales, DataSource, FoundationNft, FoundationSales, IdentityFragment,
    Withdrawal,
};
use crate::providers::{decode, nullable};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct GraphQlResponse {
    #[serde(default, deserialize_with = "nullable")]
    data: AccountsData,
    #[serde(default, deserialize_with = "nullable")]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphQlError {
    #[serde(default, deserialize_with = "nullable")]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct AccountsData {
    #[serde(default, deserialize_with = "nullable")]
    accounts: Vec<AccountNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AccountNode {
    #[serde(deserialize_with = "nullable")]
    is_admin: bool,
    #[serde(rename = "netRevenueInETH", deserialize_with = "nullable")]
    net_revenue_in_eth: String,
    #[serde(deserialize_with = "nullable")]
    nfts: Vec<NftNode>,
    #[serde(deserialize_with = "nullable")]
    creator: CreatorNode,
    #[serde(deserialize_with = "nullable")]
    withdrawals: Vec<WithdrawalNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NftNode {
    #[serde(rename = "tokenIPFSPath", deserialize_with = "nullable")]
    token_ipfs_path: String,
    #[serde(deserialize_with = "nullable")]
    name: String,
    #[serde(deserialize_with = "nullable")]
    description: String,
    #[serde(deserialize_with = "nullable")]
    image: String,
    #[serde(rename = "lastSalePriceInETH", deserialize_with = "nullable")]
    last_sale_price_in_eth: String,
    #[serde(deserialize_with = "nullable")]
    date_minted: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatorNode {
    #[serde(rename = "netSalesInETH", deserialize_with = "nullable")]
    net_sales_in_eth: String,
    #[serde(rename = "netSalesPendingInETH", deserialize_with = "nullable")]
    net_sales_pending_in_eth: String,
    #[serde(rename = "netRevenueInETH", deserialize_with = "nullable")]
    net_revenue_in_eth: String,
    #[serde(rename = "netRevenuePendingInETH", deserialize_with = "nullable")]
    net_revenue_pending_in_eth: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WithdrawalNode {
    #[serde(rename = "amountInETH", deserialize_with = "nullable")]
    amount_in_eth: String,
    #[serde(deserialize_with = "nullable")]
    date: String,
}

pub struct FoundationLookup {
    http: HttpClient,
    url: String,
}

impl FoundationLookup {
    pub fn new(http: HttpClient, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

/// Account query with the address inlined. Subgraph ids are lowercase.
fn accounts_query(address: &Address) -> String {
    // JSON string escaping is a valid GraphQL string literal.
    let id = serde_json::Value::String(address.to_lowercase()).to_string();
    format!(
        r#"{{
  accounts(where: {{id: {id}}}) {{
    isAdmin
    netRevenueInETH
    nfts {{
      tokenIPFSPath
      name
      description
      image
      dateMinted
      lastSalePriceInETH
    }}
    creator {{
      netSalesInETH
      netSalesPendingInETH
      netRevenueInETH
      netRevenuePendingInETH
    }}
    withdrawals {{
      amountInETH
      date
    }}
  }}
}}"#
    )
}

#[async_trait]
impl Lookup for FoundationLookup {
    type Item = IdentityFragment;

    fn name(&self) -> &'static str {
        "foundation"
    }

    fn source(&self) -> DataSource {
        DataSource::Foundation
    }

    async fn lookup(&self, address: &Address) -> Result<Vec<IdentityFragment>, LookupFailure> {
        let body = self
            .http
            .post_graphql(&self.url, &accounts_query(address))
            .await
            .stage("[foundation] fetch identity failed")?;

        let response: GraphQlResponse =
            decode(&body, "[foundation] identity response decode failed")?;

        if !response.errors.is_empty() {
            let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(LookupFailure::new(
                "[foundation] subgraph returned errors",
                FetchError::GraphQl(messages.join("; ")),
            ));
        }

        // One address queried, so at most one account matters.
        let Some(account) = response.data.accounts.into_iter().next() else {
            return Ok(Vec::new());
        };

        let sales = normalize(account);
        if sales.is_blank() {
            return Ok(Vec::new());
        }
        Ok(vec![IdentityFragment::FoundationSales(sales)])
    }
}

fn normalize(account: AccountNode) -> FoundationSales {
    FoundationSales {
        is_admin: account.is_admin,
        net_revenue_eth: account.net_revenue_in_eth,
        nfts: account
            .nfts
            .into_iter()
            .map(|nft| FoundationNft {
                token_ipfs_path: nft.token_ipfs_path,
                name: nft.name,
                description: nft.description,
                image: nft.image,
                last_sale_price_eth: nft.last_sale_price_in_eth,
                date_minted: nft.date_minted,
            })
            .collect(),
        creator: CreatorSales {
            net_sales_eth: account.creator.net_sales_in_eth,
            net_sales_pending_eth: account.creator.net_sales_pending_in_eth,
            net_revenue_eth: account.creator.net_revenue_in_eth,
            net_revenue_pending_eth: account.creator.net_revenue_pending_in_eth,
        },
        withdrawals: account
            .withdrawals
            .into_iter()
            .map(|w| Withdrawal {
                amount_eth: w.amount_in_eth,
                date: w.date,
            })
            .collect(),
        data_source: DataSource::Foundation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn lookup_against(body: ResponseTemplate) -> Result<Vec<IdentityFragment>, LookupFailure> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subgraphs/name/f8n/fnd"))
            .and(body_string_contains("0xabcdef"))
            .respond_with(body)
            .expect(1)
            .mount(&server)
            .await;

        let lookup = FoundationLookup::new(
            HttpClient::new(&HttpConfig::default()).unwrap(),
            &format!("{}/subgraphs/name/f8n/fnd", server.uri()),
        );
        lookup.lookup(&Address::from("0xABCDEF")).await
    }

    #[test]
    fn test_query_inlines_lowercase_address() {
        let query = accounts_query(&Address::from("0xABC"));
        assert!(query.contains(r#"accounts(where: {id: "0xabc"})"#));
        assert!(query.contains("netRevenuePendingInETH"));
    }

    #[test]
    fn test_query_escapes_quotes() {
        let query = accounts_query(&Address::from(r#"0x"}) { evil"#));
        assert!(query.contains(r#"{id: "0x\"}) { evil"}"#));
    }

    #[tokio::test]
    async fn test_account_with_activity() {
        let fragments = lookup_against(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "accounts": [{
                "isAdmin": false,
                "netRevenueInETH": "3.5",
                "nfts": [{
                    "tokenIPFSPath": "Qm123/metadata.json",
                    "name": "Piece",
                    "description": "",
                    "image": "ipfs://Qm123",
                    "lastSalePriceInETH": "1.2",
                    "dateMinted": "1614556800"
                }],
                "creator": { "netSalesInETH": "4", "netRevenueInETH": "3.5" },
                "withdrawals": [{ "amountInETH": "1.0", "date": "1614643200" }]
            }] }
        })))
        .await
        .unwrap();

        assert_eq!(fragments.len(), 1);
        match &fragments[0] {
            IdentityFragment::FoundationSales(sales) => {
                assert_eq!(sales.net_revenue_eth, "3.5");
                assert_eq!(sales.nfts[0].token_ipfs_path, "Qm123/metadata.json");
                assert_eq!(sales.creator.net_sales_eth, "4");
                assert_eq!(sales.creator.net_sales_pending_eth, "");
                assert_eq!(sales.withdrawals[0].amount_eth, "1.0");
                assert_eq!(sales.data_source, DataSource::Foundation);
            }
            other => panic!("unexpected fragment {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_account_yields_nothing() {
        let fragments = lookup_against(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "accounts": [] } })),
        )
        .await
        .unwrap();

        assert!(fragments.is_empty());
    }

    #[tokio::test]
    async fn test_idle_account_is_filtered() {
        let fragments = lookup_against(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "accounts": [{
                "isAdmin": false,
                "netRevenueInETH": "0",
                "nfts": [],
                "creator": null,
                "withdrawals": []
            }] }
        })))
        .await
        .unwrap();

        assert!(fragments.is_empty());
    }

    #[tokio::test]
    async fn test_graphql_errors_fail_lookup() {
        let failure = lookup_against(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "indexing_error" }]
        })))
        .await
        .unwrap_err();

        assert_eq!(failure.stage, "[foundation] subgraph returned errors");
        assert_eq!(failure.source.to_string(), "GraphQL error: indexing_error");
    }
}
