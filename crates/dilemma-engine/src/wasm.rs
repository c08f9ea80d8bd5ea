//! WASM bindings for the browser frontend

#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::events::Event;
use crate::session::Session;
use crate::strategy::{catalog, StrategyKind};
use crate::SimulationRequest;

fn parse_session(request_json: &str) -> Result<Session, JsError> {
    let request = SimulationRequest::from_json(request_json)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Session::from_request(request).map_err(|e| JsError::new(&e.to_string()))
}

/// Run a whole simulation and return every event
///
/// # Arguments
/// * `request_json` - JSON serialized SimulationRequest (include `seed` to replay)
///
/// # Returns
/// Array of `{event, data}` objects, ending with the summary
#[wasm_bindgen]
pub fn simulate(request_json: &str) -> Result<JsValue, JsError> {
    let events: Vec<Event> = parse_session(request_json)?.into_stream().collect();

    serde_wasm_bindgen::to_value(&events)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Get all available strategy types
#[wasm_bindgen]
pub fn get_strategy_types() -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(&catalog())
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Get human-readable description of a strategy kind
#[wasm_bindgen]
pub fn describe_strategy(kind: &str) -> Result<String, JsError> {
    let kind: StrategyKind = kind
        .parse()
        .map_err(|e: crate::ConfigError| JsError::new(&e.to_string()))?;
    Ok(kind.describe().to_string())
}

#[derive(serde::Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Validate a simulation request
///
/// Returns `{valid: true}` or `{valid: false, error: "..."}`.
/// Never throws; validation errors are returned as structured data.
#[wasm_bindgen]
pub fn validate_request(request_json: &str) -> JsValue {
    let result = match SimulationRequest::from_json(request_json).and_then(|r| r.into_config()) {
        Ok(_) => ValidationResult { valid: true, error: None },
        Err(e) => ValidationResult { valid: false, error: Some(e.to_string()) },
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}
