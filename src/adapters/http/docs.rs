//! OpenAPI document for the service.

use serde_json::{json, Value};

use crate::config::ServiceSection;
use crate::domain::DEFAULT_RISK_FREE_RATE;

pub fn openapi_document(service: &ServiceSection) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": service.title,
            "description": service.description,
            "version": env!("CARGO_PKG_VERSION"),
            "termsOfService": "/terms"
        },
        "paths": {
            "/v1/kelly_criterion": {
                "post": {
                    "summary": "Kelly criterion leverage per security",
                    "description": "Computes f = (m - r) / v from the daily simple returns of each security between start_date and end_date. A security whose data cannot be used maps to null.",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/KellyRequest"},
                                "example": {
                                    "start_date": "2018-1-1",
                                    "end_date": "2018-12-31",
                                    "securities": ["IBM", "MSFT", "AAPL"],
                                    "risk_free_rate": DEFAULT_RISK_FREE_RATE
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Leverage per distinct security, in request order",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "additionalProperties": {"type": "number", "nullable": true}
                                    },
                                    "example": {"IBM": 1.25, "MSFT": 3.5, "AAPL": null}
                                }
                            }
                        },
                        "400": {
                            "description": "Malformed request",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Error"}
                                }
                            }
                        }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Service health",
                    "responses": {"200": {"description": "Service is up"}}
                }
            },
            "/terms": {
                "get": {
                    "summary": "Terms of service",
                    "responses": {"200": {"description": "Plain text terms"}}
                }
            }
        },
        "components": {
            "schemas": {
                "KellyRequest": {
                    "type": "object",
                    "required": ["start_date", "end_date", "securities"],
                    "properties": {
                        "start_date": {"type": "string", "description": "YYYY-MM-DD"},
                        "end_date": {"type": "string", "description": "YYYY-MM-DD, after start_date"},
                        "securities": {"type": "array", "items": {"type": "string"}, "minItems": 1},
                        "risk_free_rate": {"type": "number", "default": DEFAULT_RISK_FREE_RATE}
                    }
                },
                "Error": {
                    "type": "object",
                    "properties": {"error": {"type": "string"}}
                }
            }
        }
    })
}
