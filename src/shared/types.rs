use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform response envelope: `{ success, data }` or `{ success: false, error }`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: None,
        }
    }

    pub fn error(message: String, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_error_fields() {
        let value = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn test_error_envelope() {
        let value =
            serde_json::to_value(ApiResponse::<()>::error("Not found".to_string(), None)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "success": false, "error": "Not found" })
        );
    }
}
