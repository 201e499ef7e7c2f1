//! `apigw call`: invoke a gateway method.

use serde_json::Value;
use tracing::debug;

use apigw_core::{flatten, unflatten};
use apigw_protocol::fields;

use crate::client::{ExecuteOptions, GatewayClient};
use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};
use crate::transport::HttpMethod;

/// Arguments of `apigw call`.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub method: String,
    pub version: String,
    pub params: Vec<(String, String)>,
    pub json: Option<String>,
    pub raw: bool,
    pub no_check_sign: bool,
    pub get: bool,
}

/// Assembles the nested request parameters.
///
/// `--json` is applied first, then each `--param` dotted key, then
/// `method` and `version`.
pub fn build_params(args: &CallArgs) -> CliResult<Value> {
    let mut form = match args.json.as_deref() {
        Some(text) => {
            let value: Value = serde_json::from_str(text)
                .map_err(|e| CliError::Input(format!("--json is not valid JSON: {}", e)))?;
            if !value.is_object() {
                return Err(CliError::Input("--json must be a JSON object".to_string()));
            }
            flatten(&value)
        }
        None => Default::default(),
    };
    form.extend(args.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let mut params = unflatten(&form);
    params[fields::METHOD] = Value::from(args.method.as_str());
    params[fields::VERSION] = Value::from(args.version.as_str());
    Ok(params)
}

/// Runs the call and prints the response.
pub async fn run(config: &ClientConfig, args: CallArgs) -> CliResult<()> {
    let params = build_params(&args)?;
    let client = GatewayClient::from_config(config.clone())?;

    let mut options = ExecuteOptions::new();
    if args.no_check_sign {
        options = options.with_check_response_sign(false);
    }
    if args.get {
        options = options.with_http_method(HttpMethod::Get);
    }

    debug!(method = %args.method, endpoint = %client.endpoint(), "Executing call");

    if args.raw {
        let body = client.execute_raw(&params, &options).await?;
        println!("{}", body);
        return Ok(());
    }

    let response = client.execute_with(&params, &options).await?;
    let pretty = serde_json::to_string_pretty(&response)
        .map_err(|e| CliError::Input(format!("failed to render response: {}", e)))?;
    println!("{}", pretty);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_call() -> CallArgs {
        CallArgs {
            method: "demo.echo".to_string(),
            version: "1.0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn params_from_dotted_keys() {
        let args = CallArgs {
            params: vec![
                ("input.items.1".to_string(), "a".to_string()),
                ("input.items.2".to_string(), "b".to_string()),
                ("tenant".to_string(), "t".to_string()),
            ],
            ..echo_call()
        };
        assert_eq!(
            build_params(&args).unwrap(),
            json!({
                "input": {"items": ["a", "b"]},
                "tenant": "t",
                "method": "demo.echo",
                "version": "1.0"
            })
        );
    }

    #[test]
    fn params_merge_json_then_keys() {
        let args = CallArgs {
            json: Some(r#"{"input": {"n": 1, "keep": true}, "method": "ignored"}"#.to_string()),
            params: vec![("input.n".to_string(), "2".to_string())],
            ..echo_call()
        };
        assert_eq!(
            build_params(&args).unwrap(),
            json!({
                "input": {"n": "2", "keep": true},
                "method": "demo.echo",
                "version": "1.0"
            })
        );
    }

    #[test]
    fn params_with_out_of_range_index_are_dropped() {
        let args = CallArgs {
            params: vec![
                ("items.99999999999".to_string(), "x".to_string()),
                ("tenant".to_string(), "t".to_string()),
            ],
            ..echo_call()
        };
        assert_eq!(
            build_params(&args).unwrap(),
            json!({"tenant": "t", "method": "demo.echo", "version": "1.0"})
        );
    }

    #[test]
    fn params_reject_non_object_json() {
        let args = CallArgs {
            json: Some("[1, 2]".to_string()),
            ..echo_call()
        };
        assert!(matches!(build_params(&args), Err(CliError::Input(_))));

        let args = CallArgs {
            json: Some("{oops".to_string()),
            ..echo_call()
        };
        assert!(matches!(build_params(&args), Err(CliError::Input(_))));
    }
}
