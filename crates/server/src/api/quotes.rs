use axum::{extract::State, http::HeaderMap, response::Response, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use propquote_core::documents::QuoteDocument;
use propquote_core::domain::labor::LaborLineItem;
use propquote_core::domain::quote::Quote;
use propquote_core::errors::{ApplicationError, InterfaceError};

use super::{application_failure, correlation_id, interface_failure, ApiResult, ApiState};
use crate::documents::embed_document_images;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub quote: Quote,
    #[serde(default)]
    pub labor_items: Vec<LaborLineItem>,
}

pub async fn render_quote_document(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<DocumentRequest>,
) -> ApiResult<Response> {
    let correlation_id = correlation_id(&headers);

    let mut document = QuoteDocument::from_quote(&request.quote, &request.labor_items)
        .map_err(|error| application_failure(ApplicationError::from(error), &correlation_id))?;
    embed_document_images(&mut document, state.image_fetcher.as_ref(), &correlation_id).await;

    let rendered = state.renderer.render(&document, &correlation_id).await.map_err(|error| {
        interface_failure(InterfaceError::Internal {
            message: error.to_string(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    info!(
        event_name = "api.document.served",
        correlation_id = %correlation_id,
        quote_number = %request.quote.quote_number,
        content_type = rendered.content_type(),
        "proposal document served"
    );
    Ok(rendered.into_response(&request.quote.quote_number))
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        Json,
    };
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use propquote_core::domain::labor::{LaborItemCategory, LaborLineDraft};
    use propquote_core::domain::quote::{CustomerInfo, FloorPlan, Quote, QuoteId, QuoteLineItem};

    use super::{render_quote_document, DocumentRequest};
    use crate::api::test_support::harness;
    use crate::documents::images::tests::StubImageFetcher;

    fn quote() -> Quote {
        Quote {
            id: QuoteId("q-77".to_string()),
            quote_number: "PQ-2077".to_string(),
            customer: CustomerInfo { name: "Dana Whitfield".to_string(), ..CustomerInfo::default() },
            property: None,
            billing_period: Default::default(),
            line_items: vec![QuoteLineItem {
                product_name: "Video Doorbell".to_string(),
                category: "doorbell".to_string(),
                domain: Some("security".to_string()),
                quantity: 2,
                unit_price: Decimal::new(19_900, 2),
                monthly_rate: None,
                annual_rate: None,
                description: None,
            }],
            device_placements: Vec::new(),
            floor_plans: vec![
                FloorPlan { title: "Ground floor".to_string(), image_ref: "plans/ground.png".to_string() },
                FloorPlan { title: "Attic".to_string(), image_ref: "plans/attic.png".to_string() },
            ],
            scans: Vec::new(),
            photo_pairs: Vec::new(),
            notes: Some("Gate <code> on request".to_string()),
            created_at: Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).single().expect("valid time"),
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn document_embeds_fetched_images_and_marks_missing_ones() {
        let fetcher = StubImageFetcher::default().with_image("plans/ground.png", b"png!");
        let h = harness(Vec::new(), fetcher);
        let labor = LaborLineDraft {
            category: LaborItemCategory::Installation,
            task_name: "Doorbell Installation".to_string(),
            description: "Install 2 doorbells".to_string(),
            scope_of_work: String::new(),
            estimated_hours: Decimal::new(2, 0),
            hourly_rate: Decimal::new(85, 0),
            quantity: 2,
            materials_needed: Vec::new(),
            is_optional: false,
        }
        .finish(1);

        let response = render_quote_document(
            State(h.state),
            HeaderMap::new(),
            Json(DocumentRequest { quote: quote(), labor_items: vec![labor] }),
        )
        .await
        .expect("document should render");

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("content type");
        assert!(content_type.starts_with("text/html"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let html = String::from_utf8(body.to_vec()).expect("utf-8 html");
        assert!(html.contains("PQ-2077"));
        assert!(html.contains("data:image/png;base64,cG5nIQ=="));
        assert!(html.contains("Image unavailable"));
        assert!(html.contains("Doorbell Installation"));
        assert!(html.contains("Gate &lt;code&gt; on request"));
    }

    #[tokio::test]
    async fn overflowing_prices_are_a_bad_request() {
        let h = harness(Vec::new(), StubImageFetcher::default());
        let mut quote = quote();
        quote.line_items[0].unit_price = Decimal::MAX;

        let result = render_quote_document(
            State(h.state),
            HeaderMap::new(),
            Json(DocumentRequest { quote, labor_items: Vec::new() }),
        )
        .await;

        let Err((status, body)) = result else {
            panic!("oversized unit price should be rejected");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.0.message.contains("line_items[0].unit_price"));
    }
}
