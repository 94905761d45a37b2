use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::StampRendererConfig;
use crate::domain::entity::order::Order;

/// StampRenderer は注文 1 件分の印影画像を生成し、保存先パスを返す。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StampRenderer: Send + Sync {
    async fn render(&self, order: &Order) -> anyhow::Result<String>;
}

/// レンダラーへのリクエスト DTO
#[derive(Debug, Serialize)]
struct RenderStampRequest<'a> {
    order_id: &'a str,
    transaction_id: &'a str,
    stamp_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RenderStampResponse {
    path: String,
}

/// 印影レンダラーサービスへ HTTP で委譲する `StampRenderer` 実装。
pub struct HttpStampRenderer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStampRenderer {
    pub fn new(config: &StampRendererConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("stamp renderer returned HTTP {}: {}", status, body)
    }
}

#[async_trait]
impl StampRenderer for HttpStampRenderer {
    async fn render(&self, order: &Order) -> anyhow::Result<String> {
        let body = RenderStampRequest {
            order_id: &order.order_id,
            transaction_id: &order.transaction_id,
            stamp_text: &order.stamp_text,
            font_name: order.font_name.as_deref(),
        };
        let resp = self
            .http
            .post(self.url("/api/v1/stamps/render"))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("stamp renderer unreachable: {}", e))?;
        let resp = Self::check_status(resp).await?;
        let data: RenderStampResponse = resp.json().await?;
        if data.path.is_empty() {
            anyhow::bail!("stamp renderer returned an empty path");
        }
        Ok(data.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_trims_trailing_slash() {
        let renderer = HttpStampRenderer::new(&StampRendererConfig {
            base_url: "http://stamp-renderer:8090/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            renderer.url("/api/v1/stamps/render"),
            "http://stamp-renderer:8090/api/v1/stamps/render"
        );
    }

    #[test]
    fn test_request_omits_missing_font() {
        let body = RenderStampRequest {
            order_id: "1001",
            transaction_id: "T-1",
            stamp_text: "佐藤",
            font_name: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["order_id"], "1001");
        assert!(json.get("font_name").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_renderer_fails() {
        let renderer = HttpStampRenderer::new(&StampRendererConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        let order = Order::from_new(crate::domain::entity::order::NewOrder {
            order_id: "1001".to_string(),
            transaction_id: "T-1".to_string(),
            buyer_name: None,
            item_name: None,
            quantity: 1,
            stamp_text: "佐藤".to_string(),
            font_name: None,
        });
        assert!(renderer.render(&order).await.is_err());
    }
}
