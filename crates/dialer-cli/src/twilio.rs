//! TwilioTelephony - Twilio REST API による `Telephony` port の実装
//!
//! # 実装
//! - 発信: `Calls.json` へフォーム POST し、返ってきた `sid` を CallId にする
//! - 切断: `Calls/{sid}.json` へ `Status=completed` を POST する
//! - 2xx 以外は `Rejected`、通信失敗とタイムアウトは `Transport`
//!
//! リクエストには上限時間（既定 15 秒）があります。

use std::time::Duration;

use async_trait::async_trait;
use dialer_core::domain::TelephonyError;
use dialer_core::ports::{OutboundCall, Telephony};
use dialer_core::CallId;
use serde::Deserialize;

use crate::config::TwilioCredentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TwilioTelephony {
    http: reqwest::Client,
    credentials: TwilioCredentials,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

impl TwilioTelephony {
    pub fn new(credentials: TwilioCredentials) -> Result<Self, TelephonyError> {
        Self::with_timeout(credentials, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        credentials: TwilioCredentials,
        timeout: Duration,
    ) -> Result<Self, TelephonyError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| TelephonyError::Transport(e.to_string()))?;
        Ok(Self { http, credentials })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.credentials.api_base, self.credentials.account_sid
        )
    }

    fn call_url(&self, call_id: &CallId) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.credentials.api_base, self.credentials.account_sid, call_id
        )
    }

    async fn post_form(
        &self,
        url: String,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, TelephonyError> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| TelephonyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Telephony for TwilioTelephony {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallId, TelephonyError> {
        let mut form = vec![
            ("To", call.to.as_str()),
            ("From", call.from.as_str()),
            ("Url", call.answer_url.as_str()),
            ("StatusCallback", call.status_callback.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];
        form.extend(
            call.events
                .iter()
                .map(|event| ("StatusCallbackEvent", event.as_str())),
        );

        let response = self.post_form(self.calls_url(), &form).await?;
        let created: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))?;
        Ok(CallId::new(created.sid))
    }

    async fn hang_up(&self, call_id: &CallId) -> Result<(), TelephonyError> {
        self.post_form(self.call_url(call_id), &[("Status", "completed")])
            .await?;
        Ok(())
    }
}
