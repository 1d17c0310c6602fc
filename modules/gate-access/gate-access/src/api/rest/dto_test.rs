#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::domain::error::DomainError;
    use gate_access_sdk::{AuditFilter, Direction, ListEntryPatch, PlateSource};
    use serde_json::json;

    fn check(body: serde_json::Value) -> Result<gate_access_sdk::AccessCheckRequest, DomainError> {
        serde_json::from_value::<dto::CheckAccessRequest>(body)
            .unwrap()
            .into_request()
    }

    #[test]
    fn test_check_request_with_image() {
        let req = check(json!({"imageBase64": "aW1n", "gateId": "north-1", "direction": "in"}))
            .unwrap();

        assert_eq!(
            req.source,
            PlateSource::Image {
                image_base64: "aW1n".to_owned()
            }
        );
        assert_eq!(req.direction, Direction::In);
    }

    #[test]
    fn test_check_request_with_identifier_defaults_confidence() {
        let req = check(json!({"identifier": "A123BC777", "gateId": "g", "direction": "OUT"}))
            .unwrap();

        assert_eq!(
            req.source,
            PlateSource::Recognized {
                identifier: "A123BC777".to_owned(),
                confidence: 1.0
            }
        );
        assert_eq!(req.direction, Direction::Out);
    }

    #[test]
    fn test_check_request_rejects_ambiguous_source() {
        let both = check(json!({
            "imageBase64": "aW1n", "identifier": "A123BC777", "gateId": "g", "direction": "IN"
        }));
        let neither = check(json!({"gateId": "g", "direction": "IN"}));
        let bad_direction = check(json!({"identifier": "A123BC777", "gateId": "g", "direction": "UP"}));
        let stray_confidence = check(json!({
            "imageBase64": "aW1n", "confidence": 0.9, "gateId": "g", "direction": "IN"
        }));

        for result in [both, neither, bad_direction, stray_confidence] {
            assert!(matches!(result, Err(DomainError::Validation { .. })));
        }
    }

    #[test]
    fn test_check_request_rejects_unknown_fields() {
        let result = serde_json::from_value::<dto::CheckAccessRequest>(json!({
            "identifier": "A123BC777", "gateId": "g", "direction": "IN", "speed": 40
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let cleared: ListEntryPatch =
            serde_json::from_value::<dto::UpdateListEntryRequest>(json!({"expiresAt": null}))
                .unwrap()
                .into();
        let untouched: ListEntryPatch =
            serde_json::from_value::<dto::UpdateListEntryRequest>(json!({"reason": "vip"}))
                .unwrap()
                .into();

        assert_eq!(cleared.expires_at, Some(None));
        assert_eq!(untouched.expires_at, None);
        assert_eq!(untouched.reason.as_deref(), Some("vip"));
    }

    #[test]
    fn test_audit_query_filters() {
        let plate = dto::AuditQuery {
            identifier: Some("a123 bc777".to_owned()),
            limit: Some(10_000),
            ..dto::AuditQuery::default()
        };
        let (filter, params) = plate.into_filter().unwrap();
        assert!(matches!(filter, AuditFilter::Identifier(ref id) if id.as_str() == "A123BC777"));
        assert_eq!(params.limit, gate_access_sdk::ListParams::MAX_LIMIT);

        let conflicting = dto::AuditQuery {
            identity_id: Some(uuid::Uuid::new_v4()),
            vehicle_id: Some(uuid::Uuid::new_v4()),
            ..dto::AuditQuery::default()
        };
        assert!(conflicting.into_filter().is_err());
    }

    #[test]
    fn test_create_entitlement_kind_parsing() {
        let req: dto::CreateEntitlementRequest = serde_json::from_value(json!({
            "identityId": uuid::Uuid::new_v4(),
            "kind": "Temporary",
            "validFrom": "2026-01-01T00:00:00Z",
            "validUntil": "2026-02-01T00:00:00Z",
            "vehicleIds": [uuid::Uuid::new_v4()]
        }))
        .unwrap();
        assert_eq!(
            req.clone().into_new().unwrap().kind,
            gate_access_sdk::EntitlementKind::Temporary
        );

        let bad = dto::CreateEntitlementRequest {
            kind: "forever".to_owned(),
            ..req
        };
        assert!(bad.into_new().is_err());
    }
}
