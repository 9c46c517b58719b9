//! Line-delimited JSON command feed over stdin and stdout.

use binex_dispatch::DispatchClient;
use binex_types::{BinexError, CommandResponse};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(flatten)]
    response: CommandResponse,
}

/// Submit every stdin line until EOF.
pub async fn run(client: &DispatchClient) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut out = serde_json::to_vec(&answer(client, line).await)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn answer(client: &DispatchClient, line: &str) -> Reply {
    let (correlation_id, raw) = match tag(line) {
        Ok(tagged) => tagged,
        Err(err) => {
            return Reply {
                correlation_id: None,
                response: CommandResponse::from(&err),
            };
        }
    };
    let response = match client.submit_raw(&correlation_id, raw).await {
        Ok(response) => response,
        Err(err) => CommandResponse::from(&err),
    };
    Reply {
        correlation_id: Some(correlation_id),
        response,
    }
}

/// Check the envelope shape and make sure it carries a correlation id.
fn tag(line: &str) -> Result<(String, String), BinexError> {
    let invalid = |reason: &str| BinexError::InvalidCommand {
        reason: reason.to_string(),
    };
    let mut value: Value =
        serde_json::from_str(line).map_err(|e| invalid(&e.to_string()))?;
    let envelope = value
        .as_object_mut()
        .ok_or_else(|| invalid("envelope must be a JSON object"))?;
    if !envelope.get("command").is_some_and(Value::is_string) {
        return Err(invalid("missing command"));
    }
    let correlation_id = match envelope.get("correlationId") {
        Some(Value::String(id)) => id.clone(),
        Some(_) => return Err(invalid("correlationId must be a string")),
        None => {
            let id = Uuid::now_v7().to_string();
            envelope.insert("correlationId".into(), Value::String(id.clone()));
            id
        }
    };
    Ok((correlation_id, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_caller_correlation_id() {
        let (id, raw) =
            tag(r#"{"command":"GET_PRICE","payload":{"stockSymbol":"M"},"correlationId":"c-1"}"#)
                .unwrap();
        assert_eq!(id, "c-1");
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["payload"]["stockSymbol"], "M");
    }

    #[test]
    fn generates_missing_correlation_id() {
        let (id, raw) = tag(r#"{"command":"GET_ORDER_BOOK"}"#).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["correlationId"], Value::String(id));
    }

    #[test]
    fn rejects_malformed_envelopes() {
        for line in [
            "not json",
            "[1, 2]",
            r#"{"payload":{}}"#,
            r#"{"command":"GET_ORDER_BOOK","correlationId":7}"#,
        ] {
            let err = tag(line).unwrap_err();
            assert_eq!(err.status_code(), 400, "{line}");
        }
    }

    #[test]
    fn reply_flattens_response() {
        let reply = Reply {
            correlation_id: Some("c-9".into()),
            response: CommandResponse::ok("done", Value::Null),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["correlationId"], "c-9");
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["message"], "done");
    }
}
